use serde::Serialize;

use tradecraft_auth::Actor;
use tradecraft_core::{AgentId, AssetId, FactionId, OperationId, ProfileId, RequisitionId};

/// Typed reference to the entity an audited action touched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum TargetRef {
    Operation(OperationId),
    Asset(AssetId),
    Requisition(RequisitionId),
    Faction(FactionId),
    Profile(ProfileId),
    Agent(AgentId),
}

/// Audit-trail collaborator.
///
/// Storage of the trail is external; the core only emits entries. Errors are
/// infrastructure failures and are opaque to the domain — callers go through
/// [`crate::Dispatcher`], which swallows them.
pub trait AuditSink: Send + Sync {
    fn log_action(&self, actor: &Actor, description: &str, target: TargetRef) -> anyhow::Result<()>;
}
