use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Everything the event stream records, one tag per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    SessionStart,
    SessionEnd,
    UserMessage,
    AiResponseFull,
    SystemMessage,
    FeedbackTriggered,
    FeedbackStopped,
    FeedbackCancelled,
    TaskDiscovered,
    PhaseChange,
    ProtocolViolation,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            EventKind::SessionStart => "SESSION_START",
            EventKind::SessionEnd => "SESSION_END",
            EventKind::UserMessage => "USER_MESSAGE",
            EventKind::AiResponseFull => "AI_RESPONSE_FULL",
            EventKind::SystemMessage => "SYSTEM_MESSAGE",
            EventKind::FeedbackTriggered => "FEEDBACK_TRIGGERED",
            EventKind::FeedbackStopped => "FEEDBACK_STOPPED",
            EventKind::FeedbackCancelled => "FEEDBACK_CANCELLED",
            EventKind::TaskDiscovered => "TASK_DISCOVERED",
            EventKind::PhaseChange => "PHASE_CHANGE",
            EventKind::ProtocolViolation => "PROTOCOL_VIOLATION",
            EventKind::Error => "ERROR",
        };
        f.write_str(tag)
    }
}

/// One row of the chronological event stream.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub speaker: String,
    pub message: String,
    /// Seconds, where the event measures a latency.
    pub response_time: Option<f64>,
    pub extra: String,
}

impl LogEvent {
    pub fn now(kind: EventKind, speaker: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            speaker: speaker.into(),
            message: message.into(),
            response_time: None,
            extra: String::new(),
        }
    }

    pub fn with_latency(mut self, seconds: f64) -> Self {
        self.response_time = Some(seconds);
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }
}
