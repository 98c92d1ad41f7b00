//! `tradecraft-auth` — role registry and permission evaluator.
//!
//! This crate is intentionally decoupled from HTTP and storage. Policy is a
//! declarative (role, action) table; the few rules that depend on current
//! entity state live next to it as explicit predicate hooks so both halves
//! stay independently testable.

pub mod action;
pub mod actor;
pub mod policy;
pub mod roles;

pub use action::Action;
pub use actor::Actor;
pub use policy::{
    evaluate, planning_stage_rule, require, require_planning_stage, resolve_delete, Decision,
    DeleteDisposition,
};
pub use roles::Role;
