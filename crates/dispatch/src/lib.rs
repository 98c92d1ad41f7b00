//! `tradecraft-dispatch` — audit and notification collaborator contracts.
//!
//! The lifecycle and permission layers call into these interfaces; the real
//! implementations (audit-log storage, notification delivery) live in the
//! surrounding application. Everything here is **best-effort**: a failing
//! sink never converts a successful business transition into a reported
//! failure. Failures are logged and parked in a dead-letter buffer instead.

pub mod audit;
pub mod dispatcher;
pub mod notify;
pub mod recording;

pub use audit::{AuditSink, TargetRef};
pub use dispatcher::{DeadLetter, Dispatcher};
pub use notify::Notifier;
pub use recording::{FailingSink, RecordingSink};
