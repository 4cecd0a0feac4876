use crate::history::Message;
use async_trait::async_trait;

/// The LLM seam. Implementations own transport, model choice, and the
/// system prompt; the driver supplies the per-turn prompt (user text plus
/// phase and task-status fragments) and recent history, and gets back the
/// raw reply text to parse.
#[async_trait]
pub trait Chatter: Send + Sync {
    async fn chat(&self, prompt: &str, history: &[Message]) -> anyhow::Result<String>;
}

/// The speech-output seam. `speak` dispatches text to synthesis/playback
/// and returns once queued; the host signals actual playback completion by
/// calling [`crate::DialogueDriver::speech_finished`].
#[async_trait]
pub trait Mouth: Send + Sync {
    async fn speak(&self, text: &str);
}
