//! Turn orchestration: one struct wires the lifecycle, task registry,
//! feedback coordinator, exchange log, and conversation history behind the
//! [`Chatter`] and [`Mouth`] seams.

use crate::history::{Conversation, Role};
use crate::lifecycle::{
    phase_directive, ConversationLifecycle, ConversationStats, EndReason, Event, LifecycleConfig,
    Phase,
};
use crate::reply::{parse_reply, FALLBACK_UTTERANCE};
use crate::speech::{clean_for_speech, enforce_brevity};
use crate::traits::{Chatter, Mouth};
use feedback::{schedule_after, ChannelSet, FeedbackCoordinator, FeedbackKind, FeedbackSink, TimerHandle};
use logbook::{EventKind, ExchangeLog, LogEvent};
use session::FeedbackCondition;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tasks::TaskRegistry;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Map a counterbalanced session condition onto the feedback channels it
/// enables.
pub fn channels_for(condition: FeedbackCondition) -> ChannelSet {
    match condition {
        FeedbackCondition::Baseline => ChannelSet::none(),
        FeedbackCondition::Gestures => ChannelSet::of(&[FeedbackKind::Gesture]),
        FeedbackCondition::Visual => {
            ChannelSet::of(&[FeedbackKind::VisualIcon, FeedbackKind::VisualText])
        }
        FeedbackCondition::Verbal => ChannelSet::of(&[FeedbackKind::AudioFiller]),
    }
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub participant_id: String,
    pub session_label: String,
    pub condition: FeedbackCondition,
    pub lifecycle: LifecycleConfig,
    /// Seconds of silence before feedback channels engage.
    pub feedback_delay: Duration,
    /// Messages of history handed to the model per call.
    pub history_limit: usize,
    /// Where the CSV pair lands at session end. `None` keeps logs in memory.
    pub log_dir: Option<PathBuf>,
}

impl DriverConfig {
    pub fn new(
        participant_id: impl Into<String>,
        session_label: impl Into<String>,
        condition: FeedbackCondition,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            session_label: session_label.into(),
            condition,
            lifecycle: LifecycleConfig::default(),
            feedback_delay: Duration::from_millis(500),
            history_limit: 20,
            log_dir: None,
        }
    }
}

struct DriverInner {
    lifecycle: ConversationLifecycle,
    registry: TaskRegistry,
    log: ExchangeLog,
    history: Conversation,
    turn_opened_at: Option<Instant>,
    finalize_timer: Option<TimerHandle>,
    last_bucket: u8,
}

impl DriverInner {
    fn bucket(&self) -> u8 {
        let total = self.registry.total().max(1);
        let ratio = self.registry.completed_count() as f64 / total as f64;
        if ratio < 0.3 {
            0
        } else if ratio < 0.7 {
            1
        } else if ratio < 1.0 {
            2
        } else {
            3
        }
    }

    fn stats(&self) -> ConversationStats {
        self.lifecycle
            .stats(self.registry.completed_count(), self.registry.total())
    }

    /// Close out the session log: final stats row, CSV pair on disk. A write
    /// failure is logged and swallowed; the session result in memory is
    /// intact either way.
    fn flush_logs(&mut self, log_dir: &Option<PathBuf>) {
        let stats = self.stats();
        self.log.record(LogEvent::now(
            EventKind::SessionEnd,
            "System",
            stats.to_string(),
        ));
        if let Some(dir) = log_dir {
            if let Err(e) = self.log.write_to(dir) {
                error!(error = %e, "failed to write session logs");
            }
        }
    }
}

/// Drives one research conversation end to end.
///
/// The host feeds recognized user utterances into [`DialogueDriver::take_turn`]
/// and reports playback completion through
/// [`DialogueDriver::speech_finished`]; everything between, the feedback
/// race, prompt assembly, reply parsing, task matching, and the deferred
/// ending, happens here.
pub struct DialogueDriver {
    inner: Arc<Mutex<DriverInner>>,
    feedback: Arc<FeedbackCoordinator>,
    chatter: Arc<dyn Chatter>,
    mouth: Arc<dyn Mouth>,
    events: broadcast::Sender<Event>,
    log_dir: Option<PathBuf>,
}

impl DialogueDriver {
    pub fn new(
        config: DriverConfig,
        registry: TaskRegistry,
        chatter: Arc<dyn Chatter>,
        mouth: Arc<dyn Mouth>,
        sink: Arc<dyn FeedbackSink>,
    ) -> Self {
        let lifecycle = ConversationLifecycle::new(config.lifecycle.clone());
        let events = lifecycle.event_sender();
        let feedback = Arc::new(FeedbackCoordinator::new(
            sink,
            channels_for(config.condition),
            config.feedback_delay,
        ));
        let log = ExchangeLog::new(
            &config.participant_id,
            &config.session_label,
            config.condition.to_string(),
        );
        let inner = DriverInner {
            lifecycle,
            registry,
            log,
            history: Conversation::new(config.history_limit),
            turn_opened_at: None,
            finalize_timer: None,
            last_bucket: 0,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            feedback,
            chatter,
            mouth,
            events,
            log_dir: config.log_dir,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.lifecycle.phase()
    }

    pub async fn stats(&self) -> ConversationStats {
        self.inner.lock().await.stats()
    }

    /// Begin a conversation. A no-op while one is already running: a
    /// redundant call must not disturb the running session's timers or
    /// feedback state.
    pub async fn start(&self) -> bool {
        {
            let mut inner = self.inner.lock().await;
            if !inner.lifecycle.start() {
                return false;
            }
            if let Some(timer) = inner.finalize_timer.take() {
                timer.cancel();
            }
            inner.registry.reset();
            inner.log.clear();
            inner.history.clear();
            inner.turn_opened_at = None;
            inner.last_bucket = 0;
        }
        self.feedback.stop().await;
        true
    }

    /// Run one full turn for a recognized user utterance: open the exchange,
    /// arm feedback, call the model, then speak and account for the reply.
    ///
    /// Returns the display text spoken, or `None` when the turn produced no
    /// reply (conversation not active, or the reply failed to parse and the
    /// fallback was spoken instead).
    pub async fn take_turn(&self, user_text: &str) -> anyhow::Result<Option<String>> {
        let (prompt, history) = {
            let mut inner = self.inner.lock().await;
            match inner.lifecycle.phase() {
                Phase::Active => {}
                phase => {
                    warn!(%phase, "utterance outside active conversation, dropped");
                    return Ok(None);
                }
            }

            // A violation here still runs the turn: the pending exchange is
            // waiting for a reply and this reply will close it.
            if inner.log.open_exchange(user_text) {
                inner.turn_opened_at = Some(Instant::now());
            }
            let delay = self.feedback.delay().as_secs_f64();
            inner.log.record_feedback_start(delay);
            inner.history.push(Role::User, user_text);

            let total = inner.registry.total().max(1);
            let ratio = inner.registry.completed_count() as f64 / total as f64;
            let prompt = format!(
                "{user_text}\n{}\n{}",
                phase_directive(ratio),
                inner.registry.status_directive()
            );
            (prompt, inner.history.tail().to_vec())
        };

        self.feedback.trigger(user_text).await;

        match self.chatter.chat(&prompt, &history).await {
            Ok(raw) => self.handle_reply(&raw).await,
            Err(e) => {
                error!(error = %e, "model call failed");
                if let Some(report) = self.feedback.stop().await {
                    let mut inner = self.inner.lock().await;
                    record_cycle(&mut inner.log, report);
                }
                self.speak_fallback(&format!("model call failed: {e}")).await;
                Ok(None)
            }
        }
    }

    async fn handle_reply(&self, raw: &str) -> anyhow::Result<Option<String>> {
        let report = self.feedback.stop().await;

        let reply = match parse_reply(raw) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "unparseable model reply, speaking fallback");
                if let Some(report) = report {
                    let mut inner = self.inner.lock().await;
                    record_cycle(&mut inner.log, report);
                }
                self.speak_fallback(&format!("unparseable reply: {raw}")).await;
                return Ok(None);
            }
        };

        let display = enforce_brevity(&reply.message);
        let speech = clean_for_speech(&display);

        {
            let mut inner = self.inner.lock().await;
            if let Some(report) = report {
                record_cycle(&mut inner.log, report);
            }

            inner.history.push(Role::Assistant, display.clone());
            for title in inner.registry.match_and_complete(&display) {
                inner.log.record(
                    LogEvent::now(EventKind::TaskDiscovered, "System", &title),
                );
                let _ = self.events.send(Event::TaskDiscovered(title));
            }

            let bucket = inner.bucket();
            if bucket != inner.last_bucket {
                inner.last_bucket = bucket;
                let total = inner.registry.total().max(1);
                let ratio = inner.registry.completed_count() as f64 / total as f64;
                inner.log.record(LogEvent::now(
                    EventKind::PhaseChange,
                    "System",
                    phase_directive(ratio),
                ));
            }

            let latency = inner
                .turn_opened_at
                .take()
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or_default();
            inner.log.close_exchange(&display, latency);
            inner.lifecycle.note_exchange_complete();

            if inner.lifecycle.over_time_limit() {
                inner.lifecycle.force_end(EndReason::TimeLimit);
                inner.flush_logs(&self.log_dir);
            } else {
                if inner.registry.is_complete() {
                    inner.lifecycle.queue_end(EndReason::TasksComplete);
                } else if reply.end_conversation {
                    inner.lifecycle.queue_end(EndReason::ModelRequested);
                }
                if inner.lifecycle.phase() == Phase::EndQueued
                    && inner.finalize_timer.is_none()
                {
                    self.arm_finalize_fallback(&mut inner);
                }
            }

            let _ = self.events.send(Event::Caption(display.clone()));
        }

        self.mouth.speak(&speech).await;
        Ok(Some(display))
    }

    async fn speak_fallback(&self, detail: &str) {
        {
            let mut inner = self.inner.lock().await;
            inner
                .log
                .record(LogEvent::now(EventKind::Error, "System", detail));
        }
        let _ = self.events.send(Event::Caption(FALLBACK_UTTERANCE.to_string()));
        self.mouth.speak(FALLBACK_UTTERANCE).await;
    }

    /// If the playback-complete signal never arrives, end the session anyway
    /// after a grace period.
    fn arm_finalize_fallback(&self, inner: &mut DriverInner) {
        let fallback = inner.lifecycle.config().finalize_fallback;
        let shared = self.inner.clone();
        let log_dir = self.log_dir.clone();
        info!(?fallback, "finalize fallback armed");
        inner.finalize_timer = Some(schedule_after(fallback, async move {
            let mut inner = shared.lock().await;
            inner.finalize_timer = None;
            if inner.lifecycle.phase() == Phase::EndQueued {
                warn!("no speech-complete signal, finalizing queued end");
                if inner.lifecycle.finalize_end() {
                    inner.flush_logs(&log_dir);
                }
            }
        }));
    }

    /// Host signal that the last speech output finished playing. Completes a
    /// queued end; otherwise a no-op.
    pub async fn speech_finished(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.finalize_timer.take() {
            timer.cancel();
        }
        if inner.lifecycle.phase() == Phase::EndQueued && inner.lifecycle.finalize_end() {
            inner.flush_logs(&self.log_dir);
        }
    }

    /// Chronological event CSV, as it stands right now. The same text lands
    /// on disk at session end when a log directory is configured.
    pub async fn export_event_stream(&self) -> String {
        self.inner.lock().await.log.export_event_stream()
    }

    /// Per-turn exchange CSV, as it stands right now.
    pub async fn export_exchange_table(&self) -> String {
        self.inner.lock().await.log.export_exchange_table()
    }

    /// Operator stop: ends immediately, no queued-speech courtesy.
    pub async fn force_end(&self, reason: impl Into<String>) {
        self.feedback.stop().await;
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.finalize_timer.take() {
            timer.cancel();
        }
        if inner.lifecycle.force_end(EndReason::Manual(reason.into())) {
            inner.flush_logs(&self.log_dir);
        }
    }
}

fn record_cycle(log: &mut ExchangeLog, report: feedback::CycleReport) {
    if report.cancelled {
        log.record_feedback_cancelled();
    } else {
        log.record_feedback_stop(
            report.actual_start.map(|d| d.as_secs_f64()).unwrap_or_default(),
            report.duration.map(|d| d.as_secs_f64()).unwrap_or_default(),
            report.kinds.iter().map(ToString::to_string).collect(),
        );
    }
}
