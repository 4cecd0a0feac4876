use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{info, warn};

/// Where the conversation is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Before `start()`.
    Idle,
    /// Conversation running.
    Active,
    /// Termination decided but deferred until current speech finishes.
    EndQueued,
    /// Terminal.
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Active => "active",
            Phase::EndQueued => "end-queued",
            Phase::Ended => "ended",
        };
        f.write_str(s)
    }
}

/// Why the conversation ended (or is about to).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// Every active task was discovered.
    TasksComplete,
    /// The model's structured reply asked to end.
    ModelRequested,
    /// Hard wall-clock ceiling reached.
    TimeLimit,
    /// Operator or host requested termination.
    Manual(String),
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::TasksComplete => f.write_str("all tasks complete"),
            EndReason::ModelRequested => f.write_str("model requested ending"),
            EndReason::TimeLimit => f.write_str("maximum time reached"),
            EndReason::Manual(why) => write!(f, "manual: {why}"),
        }
    }
}

/// Lifecycle notifications, fanned out over a broadcast channel instead of
/// static delegates.
#[derive(Debug, Clone)]
pub enum Event {
    ConversationStarted,
    PhaseChanged(Phase),
    TaskDiscovered(String),
    ConversationEnded { reason: String },
    /// Partial/complete assistant text for live captioning.
    Caption(String),
}

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Soft target length; informational only in the task-driven design.
    pub target_duration: Duration,
    /// Hard ceiling; exceeding it force-ends the conversation.
    pub max_duration: Duration,
    pub enforce_time_limit: bool,
    /// How long after `queue_end` to finalize if no speech-complete signal
    /// ever arrives.
    pub finalize_fallback: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            target_duration: Duration::from_secs(10 * 60),
            max_duration: Duration::from_secs(15 * 60),
            enforce_time_limit: true,
            finalize_fallback: Duration::from_secs(5),
        }
    }
}

/// Point-in-time snapshot for operator display and end-of-session logging.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationStats {
    pub phase: Phase,
    pub elapsed: Duration,
    pub exchange_count: u32,
    pub discovered: usize,
    pub total_tasks: usize,
}

impl fmt::Display for ConversationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} | {:.1} min | exchanges: {} | info: {}/{}",
            self.phase,
            self.elapsed.as_secs_f64() / 60.0,
            self.exchange_count,
            self.discovered,
            self.total_tasks
        )
    }
}

/// The conversation state machine.
///
/// Termination is sticky: once an end is queued, later user input cannot
/// cancel it. That is deliberate; a participant cannot stall the session
/// indefinitely after its objectives are met.
pub struct ConversationLifecycle {
    phase: Phase,
    config: LifecycleConfig,
    started_at: Option<Instant>,
    exchange_count: u32,
    end_reason: Option<EndReason>,
    events: broadcast::Sender<Event>,
}

impl ConversationLifecycle {
    pub fn new(config: LifecycleConfig) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            phase: Phase::Idle,
            config,
            started_at: None,
            exchange_count: 0,
            end_reason: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn exchange_count(&self) -> u32 {
        self.exchange_count
    }

    pub fn end_reason(&self) -> Option<&EndReason> {
        self.end_reason.as_ref()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or_default()
    }

    pub fn over_time_limit(&self) -> bool {
        self.config.enforce_time_limit && self.elapsed() >= self.config.max_duration
    }

    /// Begin a conversation. Re-entrant calls while one is running are a
    /// logged no-op; they never double-initialize.
    pub fn start(&mut self) -> bool {
        match self.phase {
            Phase::Active | Phase::EndQueued => {
                warn!(phase = ?self.phase, "start() while conversation running, ignoring");
                false
            }
            Phase::Idle | Phase::Ended => {
                self.phase = Phase::Active;
                self.started_at = Some(Instant::now());
                self.exchange_count = 0;
                self.end_reason = None;
                info!(
                    target_min = self.config.target_duration.as_secs() / 60,
                    max_min = self.config.max_duration.as_secs() / 60,
                    "conversation started"
                );
                let _ = self.events.send(Event::ConversationStarted);
                let _ = self.events.send(Event::PhaseChanged(Phase::Active));
                true
            }
        }
    }

    /// Decide to end, deferring actual termination until the current speech
    /// output finishes. The first queued reason wins; repeats are ignored.
    pub fn queue_end(&mut self, reason: EndReason) -> bool {
        match self.phase {
            Phase::Active => {
                info!(%reason, "conversation end queued");
                self.phase = Phase::EndQueued;
                self.end_reason = Some(reason);
                let _ = self.events.send(Event::PhaseChanged(Phase::EndQueued));
                true
            }
            Phase::EndQueued => {
                warn!(%reason, "end already queued, keeping original reason");
                false
            }
            Phase::Idle | Phase::Ended => {
                warn!(phase = ?self.phase, "queue_end outside active conversation, ignoring");
                false
            }
        }
    }

    /// Complete a queued end. Invoked by the speech-completion signal, or by
    /// the fallback timer when that signal never comes.
    pub fn finalize_end(&mut self) -> bool {
        match self.phase {
            Phase::EndQueued => {
                let reason = self
                    .end_reason
                    .clone()
                    .unwrap_or(EndReason::Manual("unspecified".into()));
                self.end(reason);
                true
            }
            _ => {
                warn!(phase = ?self.phase, "finalize_end without queued end, ignoring");
                false
            }
        }
    }

    /// Terminate immediately, bypassing the queued-speech courtesy. Used for
    /// the hard wall-clock ceiling and manual operator stops.
    pub fn force_end(&mut self, reason: EndReason) -> bool {
        match self.phase {
            Phase::Active | Phase::EndQueued => {
                self.end(reason);
                true
            }
            Phase::Idle | Phase::Ended => {
                warn!(phase = ?self.phase, "force_end outside active conversation, ignoring");
                false
            }
        }
    }

    fn end(&mut self, reason: EndReason) {
        info!(
            %reason,
            duration_min = self.elapsed().as_secs_f64() / 60.0,
            exchanges = self.exchange_count,
            "conversation ended"
        );
        self.phase = Phase::Ended;
        self.end_reason = Some(reason.clone());
        let _ = self.events.send(Event::PhaseChanged(Phase::Ended));
        let _ = self.events.send(Event::ConversationEnded {
            reason: reason.to_string(),
        });
    }

    /// Count one completed assistant turn.
    pub fn note_exchange_complete(&mut self) -> u32 {
        self.exchange_count += 1;
        self.exchange_count
    }

    pub fn stats(&self, discovered: usize, total_tasks: usize) -> ConversationStats {
        ConversationStats {
            phase: self.phase,
            elapsed: self.elapsed(),
            exchange_count: self.exchange_count,
            discovered,
            total_tasks,
        }
    }
}

/// Directive fragment for the next prompt, a pure function of task-coverage
/// progress. Conversation length tracks content coverage, not the clock.
pub fn phase_directive(completion_ratio: f64) -> &'static str {
    if completion_ratio < 0.3 {
        "[CONVERSATION START: Be warm and engaging. Ask about their background and college experience. Show genuine curiosity.]"
    } else if completion_ratio < 0.7 {
        "[CONVERSATION MIDDLE: Continue the dialogue naturally. Share your experiences and compare them with theirs. Keep the exchange flowing.]"
    } else if completion_ratio < 1.0 {
        "[CONVERSATION LATE: Most topics are covered. Continue naturally but be ready to wrap up soon.]"
    } else {
        "[CONVERSATION CLOSING: Start wrapping up warmly. Say it was great talking and offer to stay in touch. Do not end abruptly.]"
    }
}
