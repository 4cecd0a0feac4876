//! Conversation orchestration for the spoken-dialogue research rig.
//!
//! This crate decides *when* and *why* a session ends and what contextual
//! instructions each LLM call carries. The [`ConversationLifecycle`] tracks
//! `Idle → Active → EndQueued → Ended`, deferring termination until the
//! avatar finishes speaking; [`DialogueDriver`] wires the lifecycle, task
//! registry, feedback coordinator, and exchange log together behind the
//! [`Chatter`] and [`Mouth`] seams. Speech transport, UI, and the LLM HTTP
//! call all live outside, behind those traits.

pub mod driver;
pub mod history;
pub mod lifecycle;
pub mod reply;
pub mod speech;
pub mod traits;

pub use driver::{channels_for, DialogueDriver, DriverConfig};
pub use history::{Conversation, Message, Role};
pub use lifecycle::{
    phase_directive, ConversationLifecycle, ConversationStats, EndReason, Event, LifecycleConfig,
    Phase,
};
pub use reply::{parse_reply, AssistantReply, ReplyError, FALLBACK_UTTERANCE};
pub use speech::{clean_for_speech, enforce_brevity};
pub use traits::{Chatter, Mouth};
