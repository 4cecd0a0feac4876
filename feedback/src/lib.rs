//! Delayed, cancelable "thinking" cues shown while the LLM round-trip is in
//! flight.
//!
//! The [`FeedbackCoordinator`] races a short delay timer against the real
//! response: if the reply lands first the cue is cancelled and nothing is
//! ever shown; if the delay elapses first the enabled channels (verbal
//! filler, spinner, caption, gesture) light up until [`FeedbackCoordinator::stop`]
//! is called. At most one cycle is ever outstanding.

pub mod channel;
pub mod coordinator;
pub mod phrases;
pub mod timer;

pub use channel::{ChannelSet, FeedbackKind, FeedbackSink};
pub use coordinator::{CycleReport, FeedbackCoordinator};
pub use phrases::choose_filler;
pub use timer::{schedule_after, TimerHandle};
