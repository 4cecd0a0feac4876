use crate::csv;
use crate::event::{EventKind, LogEvent};
use crate::exchange::Exchange;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("log write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only research log for one conversation session.
#[derive(Debug)]
pub struct ExchangeLog {
    participant_id: String,
    session_label: String,
    condition: String,
    events: Vec<LogEvent>,
    history: Vec<Exchange>,
    open: Option<Exchange>,
}

impl ExchangeLog {
    pub fn new(
        participant_id: impl Into<String>,
        session_label: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        let mut log = Self {
            participant_id: participant_id.into(),
            session_label: session_label.into(),
            condition: condition.into(),
            events: Vec::new(),
            history: Vec::new(),
            open: None,
        };
        let banner = format!(
            "Participant: {}, Condition: {}",
            log.participant_id, log.condition
        );
        log.record(LogEvent::now(EventKind::SessionStart, "System", banner));
        log
    }

    /// Append an arbitrary event row.
    pub fn record(&mut self, event: LogEvent) {
        self.events.push(event);
    }

    /// Open a new exchange for `user_text`. Returns `false` and appends a
    /// violation record when one is already open: the first exchange is
    /// never mutated by the offending call.
    pub fn open_exchange(&mut self, user_text: &str) -> bool {
        if self.open.is_some() {
            warn!("user utterance arrived while an exchange is open, ignoring");
            self.record(
                LogEvent::now(
                    EventKind::ProtocolViolation,
                    "System",
                    "second utterance while exchange open",
                )
                .with_extra(user_text),
            );
            return false;
        }
        let index = self.history.len();
        self.open = Some(Exchange::open(index, user_text));
        self.record(LogEvent::now(EventKind::UserMessage, "User", user_text));
        true
    }

    /// Note that the feedback delay was armed for the open exchange.
    pub fn record_feedback_start(&mut self, delay_configured_secs: f64) {
        let Some(ex) = self.open.as_mut() else { return };
        ex.feedback_delay_configured = Some(delay_configured_secs);
        self.record(
            LogEvent::now(EventKind::FeedbackTriggered, "System", "feedback armed")
                .with_extra(format!("delay={delay_configured_secs:.3}s")),
        );
    }

    /// Note that feedback activated and was later stopped.
    pub fn record_feedback_stop(
        &mut self,
        actual_start_secs: f64,
        duration_secs: f64,
        kinds: Vec<String>,
    ) {
        let Some(ex) = self.open.as_mut() else { return };
        ex.feedback_actual_start = Some(actual_start_secs);
        ex.feedback_duration = Some(duration_secs);
        ex.feedback_kinds = kinds.clone();
        self.record(
            LogEvent::now(EventKind::FeedbackStopped, "System", kinds.join("+"))
                .with_latency(duration_secs),
        );
    }

    /// Note that the response arrived before the delay elapsed.
    pub fn record_feedback_cancelled(&mut self) {
        let Some(ex) = self.open.as_mut() else { return };
        ex.feedback_cancelled = true;
        self.record(LogEvent::now(
            EventKind::FeedbackCancelled,
            "System",
            "response arrived before feedback delay",
        ));
    }

    /// Close the open exchange with the full assistant reply. Returns
    /// `false` with a violation record when none is open.
    pub fn close_exchange(&mut self, assistant_text: &str, response_latency_secs: f64) -> bool {
        let Some(mut ex) = self.open.take() else {
            warn!("close_exchange with no open exchange, ignoring");
            self.record(LogEvent::now(
                EventKind::ProtocolViolation,
                "System",
                "close_exchange without open exchange",
            ));
            return false;
        };
        ex.assistant_message = Some(assistant_text.to_string());
        ex.response_latency = Some(response_latency_secs);
        self.history.push(ex);
        self.record(
            LogEvent::now(EventKind::AiResponseFull, "Assistant", assistant_text)
                .with_latency(response_latency_secs),
        );
        true
    }

    pub fn has_open_exchange(&self) -> bool {
        self.open.is_some()
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.history
    }

    /// Drop everything and start a fresh stream. Only a new conversation
    /// start does this.
    pub fn clear(&mut self) {
        self.events.clear();
        self.history.clear();
        self.open = None;
        let banner = format!(
            "Participant: {}, Condition: {}",
            self.participant_id, self.condition
        );
        self.record(LogEvent::now(EventKind::SessionStart, "System", banner));
    }

    /// Flat chronological CSV of every event.
    pub fn export_event_stream(&self) -> String {
        let mut out = String::from(
            "Timestamp,ParticipantID,SessionID,Condition,EventType,Speaker,Message,ResponseTime,Extra\n",
        );
        for e in &self.events {
            let fields = vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                csv::escape(&self.participant_id),
                csv::escape(&self.session_label),
                csv::escape(&self.condition),
                e.kind.to_string(),
                csv::escape(&e.speaker),
                csv::escape(&e.message),
                e.response_time.map(|t| format!("{t:.3}")).unwrap_or_default(),
                csv::escape(&e.extra),
            ];
            out.push_str(&csv::row(&fields));
            out.push('\n');
        }
        out
    }

    /// Per-turn summary CSV, one row per closed exchange.
    pub fn export_exchange_table(&self) -> String {
        let mut out = String::from(
            "Index,TurnStart,UserMessage,AssistantMessage,ResponseLatency,FeedbackKinds,FeedbackDelayConfigured,FeedbackActualStart,FeedbackDuration,FeedbackCancelled\n",
        );
        for ex in &self.history {
            let fields = vec![
                ex.index.to_string(),
                ex.turn_started_at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                csv::escape(&ex.user_message),
                csv::escape(ex.assistant_message.as_deref().unwrap_or("")),
                ex.response_latency.map(|t| format!("{t:.3}")).unwrap_or_default(),
                csv::escape(&ex.feedback_kinds.join("+")),
                ex.feedback_delay_configured
                    .map(|t| format!("{t:.3}"))
                    .unwrap_or_default(),
                ex.feedback_actual_start
                    .map(|t| format!("{t:.3}"))
                    .unwrap_or_default(),
                ex.feedback_duration
                    .map(|t| format!("{t:.3}"))
                    .unwrap_or_default(),
                ex.feedback_cancelled.to_string(),
            ];
            out.push_str(&csv::row(&fields));
            out.push('\n');
        }
        out
    }

    /// Write both tables under `dir`. Failures are the caller's to log; the
    /// session itself must keep running either way.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf), LogError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let stem = format!("{}_{}", self.participant_id, self.session_label);
        let events_path = dir.join(format!("{stem}_events.csv"));
        let table_path = dir.join(format!("{stem}_exchanges.csv"));
        fs::write(&events_path, self.export_event_stream())?;
        fs::write(&table_path, self.export_exchange_table())?;
        info!(
            events = %events_path.display(),
            exchanges = %table_path.display(),
            "session logs written"
        );
        Ok((events_path, table_path))
    }
}
