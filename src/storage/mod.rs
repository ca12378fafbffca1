//! Append-only audit trail of classified events.

mod event_log;

pub use event_log::EventLog;
