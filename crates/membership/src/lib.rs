//! `tradecraft-membership` — factions and who belongs to them.
//!
//! A faction carries a threat level and a membership map keyed by profile.
//! Membership changes arrive as reconcile batches (add / update / remove)
//! applied atomically per faction, with a history snapshot appended whenever
//! a batch actually changed something.

pub mod faction;
pub mod reconcile;

pub use faction::{Affiliation, Faction, HistorySnapshot, Membership, ThreatLevel};
pub use reconcile::{
    FactionDirectory, FactionDraft, FactionPatch, MemberEntry, ReconcileOutcome,
};
