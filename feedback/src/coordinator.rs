use crate::channel::{ChannelSet, FeedbackKind, FeedbackSink};
use crate::phrases::choose_filler;
use crate::timer::{schedule_after, TimerHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Timing record for one completed (or cancelled) feedback cycle, consumed
/// by the exchange log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Channels that actually engaged. Empty when the cycle was cancelled
    /// before activation or no channels are enabled.
    pub kinds: Vec<FeedbackKind>,
    pub phrase: Option<String>,
    pub configured_delay: Duration,
    /// Offset from trigger to activation, absent if never activated.
    pub actual_start: Option<Duration>,
    /// How long channels were visibly active, absent if never activated.
    pub duration: Option<Duration>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    PendingDelay,
    Active,
}

struct Cycle {
    phase: Phase,
    preview: String,
    triggered_at: Option<Instant>,
    activated_at: Option<Instant>,
    phrase: Option<String>,
    engaged: Vec<FeedbackKind>,
}

impl Cycle {
    fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            preview: String::new(),
            triggered_at: None,
            activated_at: None,
            phrase: None,
            engaged: Vec::new(),
        }
    }
}

/// Runs the per-turn feedback cycle: `Idle → PendingDelay → Active → Idle`,
/// with a short-circuit back to `Idle` when the real response beats the
/// delay timer.
///
/// The cycle state is a single async mutex held across the sink calls, so
/// activation and stop can never interleave: whichever of the timer task and
/// [`FeedbackCoordinator::stop`] takes the lock first decides the cycle.
pub struct FeedbackCoordinator {
    sink: Arc<dyn FeedbackSink>,
    enabled: ChannelSet,
    delay: Duration,
    cycle: Arc<Mutex<Cycle>>,
    timer: Mutex<Option<TimerHandle>>,
}

impl FeedbackCoordinator {
    pub fn new(sink: Arc<dyn FeedbackSink>, enabled: ChannelSet, delay: Duration) -> Self {
        Self {
            sink,
            enabled,
            delay,
            cycle: Arc::new(Mutex::new(Cycle::idle())),
            timer: Mutex::new(None),
        }
    }

    pub fn enabled(&self) -> ChannelSet {
        self.enabled
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the feedback delay for a new turn. `preview` is the user text the
    /// reply is being generated for; it steers filler phrase choice.
    ///
    /// A still-outstanding previous cycle is cancelled first: only one cycle
    /// may exist at a time.
    pub async fn trigger(&self, preview: &str) {
        if self.stop().await.is_some() {
            warn!("previous feedback cycle still outstanding at trigger, cancelled");
        }

        {
            let mut cycle = self.cycle.lock().await;
            *cycle = Cycle {
                phase: Phase::PendingDelay,
                preview: preview.to_string(),
                triggered_at: Some(Instant::now()),
                ..Cycle::idle()
            };
        }
        debug!(delay = ?self.delay, "feedback delay armed");

        let cycle = self.cycle.clone();
        let sink = self.sink.clone();
        let enabled = self.enabled;
        let handle = schedule_after(self.delay, async move {
            let mut c = cycle.lock().await;
            if c.phase != Phase::PendingDelay {
                return;
            }
            c.phase = Phase::Active;
            c.activated_at = Some(Instant::now());
            let phrase = choose_filler(&c.preview, &mut rand::thread_rng());
            c.phrase = Some(phrase.clone());
            c.engaged = enabled.kinds();
            info!(phrase = %phrase, channels = c.engaged.len(), "feedback activated");
            for kind in c.engaged.clone() {
                sink.start_channel(kind, Some(&phrase)).await;
            }
        });
        *self.timer.lock().await = Some(handle);
    }

    /// End the current cycle: cancel the delay if still pending, otherwise
    /// switch every engaged channel off and record how long it ran.
    ///
    /// Idempotent; returns `None` when no cycle is outstanding.
    pub async fn stop(&self) -> Option<CycleReport> {
        if let Some(timer) = self.timer.lock().await.take() {
            timer.cancel();
        }

        let mut c = self.cycle.lock().await;
        match c.phase {
            Phase::Idle => None,
            Phase::PendingDelay => {
                c.phase = Phase::Idle;
                let engaged = std::mem::take(&mut c.engaged);
                for kind in &engaged {
                    self.sink.stop_channel(*kind).await;
                }
                debug!("feedback cancelled before activation");
                Some(CycleReport {
                    kinds: Vec::new(),
                    phrase: None,
                    configured_delay: self.delay,
                    actual_start: None,
                    duration: None,
                    cancelled: true,
                })
            }
            Phase::Active => {
                c.phase = Phase::Idle;
                let engaged = std::mem::take(&mut c.engaged);
                for kind in &engaged {
                    self.sink.stop_channel(*kind).await;
                }
                let actual_start = match (c.triggered_at, c.activated_at) {
                    (Some(t), Some(a)) => Some(a.duration_since(t)),
                    _ => None,
                };
                let duration = c.activated_at.map(|a| a.elapsed());
                info!(?duration, "feedback stopped");
                Some(CycleReport {
                    kinds: engaged,
                    phrase: c.phrase.take(),
                    configured_delay: self.delay,
                    actual_start,
                    duration,
                    cancelled: false,
                })
            }
        }
    }
}
