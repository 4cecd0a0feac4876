use chrono::{DateTime, Utc};
use serde::Serialize;

/// One user-utterance/assistant-reply pair plus its feedback timing.
///
/// Opened when the user utterance arrives; closed when the full assistant
/// reply lands. At most one exchange is open at any time.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    pub index: usize,
    pub user_message: String,
    pub assistant_message: Option<String>,
    pub turn_started_at: DateTime<Utc>,
    /// Seconds from user utterance to full reply.
    pub response_latency: Option<f64>,
    pub feedback_kinds: Vec<String>,
    /// Seconds of configured delay before feedback would activate.
    pub feedback_delay_configured: Option<f64>,
    /// Seconds from trigger to activation; absent if feedback never showed.
    pub feedback_actual_start: Option<f64>,
    /// Seconds feedback was visibly active; absent if cancelled in time.
    pub feedback_duration: Option<f64>,
    pub feedback_cancelled: bool,
}

impl Exchange {
    pub fn open(index: usize, user_message: impl Into<String>) -> Self {
        Self {
            index,
            user_message: user_message.into(),
            assistant_message: None,
            turn_started_at: Utc::now(),
            response_latency: None,
            feedback_kinds: Vec::new(),
            feedback_delay_configured: None,
            feedback_actual_start: None,
            feedback_duration: None,
            feedback_cancelled: false,
        }
    }
}
