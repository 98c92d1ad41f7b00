//! `tradecraft-ledger` — allocatable assets and their requisition workflow.
//!
//! Assets are shared, reusable resources; requisitions tie one asset to one
//! operation for the duration of that operation. All mutations are applied
//! atomically under a single ledger lock, which is what serializes competing
//! approvals for the same asset.

pub mod asset;
pub mod ledger;
pub mod requisition;

pub use asset::{Asset, AssetKind, AssetStatus};
pub use ledger::ResourceLedger;
pub use requisition::{Requisition, RequisitionStatus};
