//! Session identity, counterbalancing, and reproducible task selection.
//!
//! A participant runs up to four sessions. Each session maps to a feedback
//! condition through a fixed Latin-square table, and to a subset of the task
//! pool that is persisted on first run so replays are bit-identical and
//! later sessions never repeat earlier topics until the pool runs dry.

pub mod condition;
pub mod store;

pub use condition::{resolve_condition, FeedbackCondition};
pub use store::{SessionError, SessionKey, SessionRecord, SessionStore};
