//! Discoverable background facts and the registry that tracks them.
//!
//! Each session the avatar carries a handful of facts about itself (its
//! dorm, its roommate, its weekend habits) that the participant is meant to
//! surface through conversation. The [`TaskRegistry`] watches assistant
//! speech for trigger keywords and marks facts discovered; completion drives
//! when the conversation is allowed to wind down.

pub mod pool;
pub mod registry;

pub use pool::{master_pool, select_active_tasks, Task};
pub use registry::TaskRegistry;
