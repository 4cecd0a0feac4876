use async_trait::async_trait;
use dialogue::{
    channels_for, Chatter, DialogueDriver, DriverConfig, Event, Message, Mouth, Phase,
    FALLBACK_UTTERANCE,
};
use feedback::{ChannelSet, FeedbackKind, FeedbackSink};
use session::FeedbackCondition;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tasks::{Task, TaskRegistry};
use tokio::sync::Mutex;

struct ScriptedChatter {
    replies: StdMutex<VecDeque<String>>,
    prompts: Arc<StdMutex<Vec<String>>>,
    latency: Duration,
}

impl ScriptedChatter {
    fn new(replies: &[&str], latency: Duration) -> (Arc<Self>, Arc<StdMutex<Vec<String>>>) {
        let prompts = Arc::new(StdMutex::new(Vec::new()));
        let chatter = Arc::new(Self {
            replies: StdMutex::new(replies.iter().map(|s| s.to_string()).collect()),
            prompts: prompts.clone(),
            latency,
        });
        (chatter, prompts)
    }
}

#[async_trait]
impl Chatter for ScriptedChatter {
    async fn chat(&self, prompt: &str, _history: &[Message]) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

struct RecMouth(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl Mouth for RecMouth {
    async fn speak(&self, text: &str) {
        self.0.lock().await.push(text.to_string());
    }
}

struct RecSink(Arc<Mutex<Vec<(String, String)>>>);

#[async_trait]
impl FeedbackSink for RecSink {
    async fn start_channel(&self, kind: FeedbackKind, _phrase: Option<&str>) {
        self.0.lock().await.push(("start".into(), kind.to_string()));
    }
    async fn stop_channel(&self, kind: FeedbackKind) {
        self.0.lock().await.push(("stop".into(), kind.to_string()));
    }
}

fn two_task_registry() -> TaskRegistry {
    TaskRegistry::new(vec![
        Task::new("dorm life", &["dorm"]),
        Task::new("brother Jake", &["jake"]),
    ])
}

struct Rig {
    driver: DialogueDriver,
    prompts: Arc<StdMutex<Vec<String>>>,
    spoken: Arc<Mutex<Vec<String>>>,
    sink_calls: Arc<Mutex<Vec<(String, String)>>>,
}

fn rig(
    condition: FeedbackCondition,
    replies: &[&str],
    latency: Duration,
    log_dir: Option<std::path::PathBuf>,
) -> Rig {
    let (chatter, prompts) = ScriptedChatter::new(replies, latency);
    let spoken = Arc::new(Mutex::new(Vec::new()));
    let sink_calls = Arc::new(Mutex::new(Vec::new()));
    let mut config = DriverConfig::new("P01", "Session1", condition);
    config.log_dir = log_dir;
    let driver = DialogueDriver::new(
        config,
        two_task_registry(),
        chatter,
        Arc::new(RecMouth(spoken.clone())),
        Arc::new(RecSink(sink_calls.clone())),
    );
    Rig {
        driver,
        prompts,
        spoken,
        sink_calls,
    }
}

#[tokio::test(start_paused = true)]
async fn tasks_complete_queues_end_and_speech_finished_ends() {
    let dir = tempfile::tempdir().unwrap();
    let rig = rig(
        FeedbackCondition::Baseline,
        &[
            r#"{"message": "I lived in a dorm freshman year.", "end_conversation": false}"#,
            r#"{"message": "My brother Jake says hi.", "end_conversation": false}"#,
        ],
        Duration::ZERO,
        Some(dir.path().to_path_buf()),
    );
    let mut rx = rig.driver.subscribe();

    assert!(rig.driver.start().await);
    rig.driver.take_turn("where do you live?").await.unwrap();
    assert_eq!(rig.driver.phase().await, Phase::Active);

    rig.driver.take_turn("any siblings?").await.unwrap();
    assert_eq!(rig.driver.phase().await, Phase::EndQueued);

    rig.driver.speech_finished().await;
    assert_eq!(rig.driver.phase().await, Phase::Ended);

    let mut discovered = Vec::new();
    let mut ended = None;
    while let Ok(event) = rx.try_recv() {
        match event {
            Event::TaskDiscovered(title) => discovered.push(title),
            Event::ConversationEnded { reason } => ended = Some(reason),
            _ => {}
        }
    }
    assert_eq!(discovered, vec!["dorm life", "brother Jake"]);
    assert_eq!(ended.as_deref(), Some("all tasks complete"));

    let events_csv = dir.path().join("P01_Session1_events.csv");
    let exchanges_csv = dir.path().join("P01_Session1_exchanges.csv");
    assert!(events_csv.exists());
    assert!(exchanges_csv.exists());
    let stream = std::fs::read_to_string(events_csv).unwrap();
    assert!(stream.contains("TASK_DISCOVERED"));
    assert!(stream.contains("SESSION_END"));
    let table = std::fs::read_to_string(exchanges_csv).unwrap();
    assert_eq!(table.lines().count(), 3);
}

#[tokio::test(start_paused = true)]
async fn model_requested_end_finalizes_by_fallback_timer() {
    let rig = rig(
        FeedbackCondition::Baseline,
        &[r#"{"message": "It was lovely talking. Goodbye!", "end_conversation": true}"#],
        Duration::ZERO,
        None,
    );
    rig.driver.start().await;
    rig.driver.take_turn("I should head out").await.unwrap();
    assert_eq!(rig.driver.phase().await, Phase::EndQueued);

    // No speech_finished call ever arrives.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(rig.driver.phase().await, Phase::Ended);
}

#[tokio::test(start_paused = true)]
async fn malformed_reply_speaks_fallback_and_later_reply_closes_the_exchange() {
    let rig = rig(
        FeedbackCondition::Baseline,
        &[
            "sorry, plain prose today",
            r#"{"message": "Right, as I was saying.", "end_conversation": false}"#,
        ],
        Duration::ZERO,
        None,
    );
    rig.driver.start().await;

    let first = rig.driver.take_turn("tell me about campus").await.unwrap();
    assert_eq!(first, None);
    assert_eq!(
        rig.spoken.lock().await.last().map(String::as_str),
        Some(FALLBACK_UTTERANCE)
    );
    assert_eq!(rig.driver.stats().await.exchange_count, 0);

    let second = rig.driver.take_turn("you still there?").await.unwrap();
    assert_eq!(second.as_deref(), Some("Right, as I was saying."));
    assert_eq!(rig.driver.stats().await.exchange_count, 1);

    let stream = rig.driver.export_event_stream().await;
    assert!(stream.contains("ERROR"));
    assert!(stream.contains("PROTOCOL_VIOLATION"));
    // The surviving exchange is the one the first utterance opened.
    let table = rig.driver.export_exchange_table().await;
    assert!(table.contains("tell me about campus"));
    assert!(!table.contains("you still there?"));
}

#[tokio::test(start_paused = true)]
async fn replies_are_clamped_and_cleaned_before_speaking() {
    let rig = rig(
        FeedbackCondition::Baseline,
        &[r#"{"message": "I *love* the dining hall!! Try the pasta. Also the salad. And soup.", "end_conversation": false}"#],
        Duration::ZERO,
        None,
    );
    rig.driver.start().await;
    let display = rig.driver.take_turn("where should I eat?").await.unwrap();
    assert_eq!(
        display.as_deref(),
        Some("I love the dining hall!! Try the pasta.")
    );
    assert_eq!(
        rig.spoken.lock().await.last().map(String::as_str),
        Some("I love the dining hall! Try the pasta.")
    );
}

#[tokio::test(start_paused = true)]
async fn utterances_outside_active_are_dropped() {
    let rig = rig(
        FeedbackCondition::Baseline,
        &[r#"{"message": "hi", "end_conversation": false}"#],
        Duration::ZERO,
        None,
    );
    assert_eq!(rig.driver.take_turn("hello?").await.unwrap(), None);
    assert!(rig.prompts.lock().unwrap().is_empty());

    rig.driver.start().await;
    rig.driver.force_end("experimenter stop").await;
    assert_eq!(rig.driver.phase().await, Phase::Ended);
    assert_eq!(rig.driver.take_turn("hello?").await.unwrap(), None);
    assert!(rig.prompts.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_reply_activates_verbal_feedback_then_stops_it() {
    let rig = rig(
        FeedbackCondition::Verbal,
        &[r#"{"message": "Good question.", "end_conversation": false}"#],
        Duration::from_secs(1),
        None,
    );
    rig.driver.start().await;
    rig.driver.take_turn("what's your major?").await.unwrap();

    let calls = rig.sink_calls.lock().await.clone();
    assert_eq!(
        calls,
        vec![
            ("start".to_string(), "audio-filler".to_string()),
            ("stop".to_string(), "audio-filler".to_string()),
        ]
    );
    let stream = rig.driver.export_event_stream().await;
    assert!(stream.contains("FEEDBACK_STOPPED"));
}

#[tokio::test(start_paused = true)]
async fn fast_reply_cancels_feedback_before_it_shows() {
    let rig = rig(
        FeedbackCondition::Verbal,
        &[r#"{"message": "Easy one.", "end_conversation": false}"#],
        Duration::ZERO,
        None,
    );
    rig.driver.start().await;
    rig.driver.take_turn("quick question").await.unwrap();

    assert!(rig.sink_calls.lock().await.is_empty());
    let stream = rig.driver.export_event_stream().await;
    assert!(stream.contains("FEEDBACK_CANCELLED"));
    assert!(!stream.contains("FEEDBACK_STOPPED"));
}

#[tokio::test(start_paused = true)]
async fn model_error_stops_active_feedback() {
    // Empty script: the chatter fails after the feedback delay has elapsed.
    let rig = rig(FeedbackCondition::Verbal, &[], Duration::from_secs(1), None);
    rig.driver.start().await;
    let out = rig.driver.take_turn("what's your favorite class?").await.unwrap();
    assert_eq!(out, None);
    assert_eq!(
        rig.spoken.lock().await.last().map(String::as_str),
        Some(FALLBACK_UTTERANCE)
    );

    // Long after the turn settles, the thinking cue must be off.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let calls = rig.sink_calls.lock().await.clone();
    assert_eq!(
        calls,
        vec![
            ("start".to_string(), "audio-filler".to_string()),
            ("stop".to_string(), "audio-filler".to_string()),
        ]
    );
    let stream = rig.driver.export_event_stream().await;
    assert!(stream.contains("FEEDBACK_STOPPED"));
    assert!(stream.contains("ERROR"));
}

#[tokio::test(start_paused = true)]
async fn rejected_restart_keeps_finalize_fallback_armed() {
    let rig = rig(
        FeedbackCondition::Baseline,
        &[r#"{"message": "Great chatting. Bye!", "end_conversation": true}"#],
        Duration::ZERO,
        None,
    );
    rig.driver.start().await;
    rig.driver.take_turn("gotta run").await.unwrap();
    assert_eq!(rig.driver.phase().await, Phase::EndQueued);

    // A redundant start() while the end is queued is rejected and must not
    // disturb the pending finalize timer.
    assert!(!rig.driver.start().await);
    assert_eq!(rig.driver.phase().await, Phase::EndQueued);

    // The speech-complete signal never arrives; the fallback still fires.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(rig.driver.phase().await, Phase::Ended);
}

#[tokio::test(start_paused = true)]
async fn prompts_carry_phase_and_status_fragments() {
    let rig = rig(
        FeedbackCondition::Baseline,
        &[
            r#"{"message": "The dorm was loud but fun.", "end_conversation": false}"#,
            r#"{"message": "Mostly studying these days.", "end_conversation": false}"#,
        ],
        Duration::ZERO,
        None,
    );
    rig.driver.start().await;
    rig.driver.take_turn("how was freshman housing?").await.unwrap();
    rig.driver.take_turn("what do you do now?").await.unwrap();

    let prompts = rig.prompts.lock().unwrap().clone();
    assert!(prompts[0].contains("[CONVERSATION START"));
    assert!(prompts[0].contains("dorm life"));
    assert!(prompts[0].contains("brother Jake"));
    // One of two tasks done by the first reply.
    assert!(prompts[1].contains("[CONVERSATION MIDDLE"));
    assert!(!prompts[1].contains("dorm life"));
    assert!(prompts[1].contains("brother Jake"));
}

#[test]
fn conditions_map_to_their_channels() {
    assert!(channels_for(FeedbackCondition::Baseline).is_empty());
    assert_eq!(
        channels_for(FeedbackCondition::Gestures),
        ChannelSet::of(&[FeedbackKind::Gesture])
    );
    assert_eq!(
        channels_for(FeedbackCondition::Visual),
        ChannelSet::of(&[FeedbackKind::VisualIcon, FeedbackKind::VisualText])
    );
    assert_eq!(
        channels_for(FeedbackCondition::Verbal),
        ChannelSet::of(&[FeedbackKind::AudioFiller])
    );
}
