//! Research logging: a flat chronological event stream plus a per-turn
//! exchange table, exported as two correlated CSV files at session end.
//!
//! The log is append-only. A caller that breaks the protocol (opening a
//! second exchange while one is open) gets a violation record in the event
//! stream instead of silent data loss.

pub mod csv;
pub mod event;
pub mod exchange;
pub mod log;

pub use event::{EventKind, LogEvent};
pub use exchange::Exchange;
pub use log::{ExchangeLog, LogError};
