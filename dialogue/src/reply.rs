use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Spoken when the model's reply cannot be parsed. The exchange stays open
/// so the participant's next utterance can still be answered properly.
pub const FALLBACK_UTTERANCE: &str = "Sorry, I didn't quite catch that.";

/// Structured reply contract the model is prompted to honor: a JSON object
/// with the utterance and an explicit end-of-conversation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub message: String,
    #[serde(default)]
    pub end_conversation: bool,
}

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply is not valid JSON: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("reply parsed but message is empty")]
    EmptyMessage,
}

/// Parse a raw model reply. Tolerates markdown code fences around the JSON,
/// which some models add despite instructions.
pub fn parse_reply(raw: &str) -> Result<AssistantReply, ReplyError> {
    let trimmed = strip_fences(raw.trim());
    let reply: AssistantReply = serde_json::from_str(trimmed)?;
    if reply.message.trim().is_empty() {
        return Err(ReplyError::EmptyMessage);
    }
    Ok(reply)
}

fn strip_fences(s: &str) -> &str {
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}
