//! `tradecraft-operations` — the Operation lifecycle.
//!
//! An Operation is a mission entity moving through a fixed state machine:
//! PLANNING → ACTIVE → CONCLUDED_SUCCESS | CONCLUDED_FAILURE, or ACTIVE →
//! COMPROMISED via abort. The entity ([`Operation`]) owns the transition
//! guards; the service ([`OperationsService`]) layers permission checks,
//! asset release, audit, and best-effort notification fan-out on top.

pub mod operation;
pub mod service;

pub use operation::{
    Assignment, CollateralRisk, LogEntry, Operation, OperationPatch, OperationStatus, Outcome,
};
pub use service::{OperationDraft, OperationsService};
