use serde::{Deserialize, Serialize};

/// Coarse verbs gated by the policy table.
///
/// Soft and hard delete are distinct actions (`Archive` vs `Purge`) rather
/// than one verb with role-conditional behavior; see
/// [`crate::policy::resolve_delete`] for the mapping services use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// View/list any case entity.
    Read,
    /// Create a case entity (agent, faction, profile, operation).
    Create,
    /// Update a case entity.
    Update,
    /// Hard delete — the record is gone.
    Purge,
    /// Soft delete — the record is hidden, not destroyed.
    Archive,
    /// Move an operation from PLANNING to ACTIVE.
    CommenceOperation,
    /// Close out an ACTIVE operation with an outcome.
    ConcludeOperation,
    /// Abort an ACTIVE operation (marks it COMPROMISED).
    AbortOperation,
    /// Append a log entry to an ACTIVE operation.
    AppendOperationLog,
    /// File an asset requisition for an operation.
    RequestAsset,
    /// Approve or deny a pending requisition.
    DecideRequisition,
    /// Bulk add/update/remove faction memberships.
    ReconcileMembership,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Purge,
        Action::Archive,
        Action::CommenceOperation,
        Action::ConcludeOperation,
        Action::AbortOperation,
        Action::AppendOperationLog,
        Action::RequestAsset,
        Action::DecideRequisition,
        Action::ReconcileMembership,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Purge => "purge",
            Action::Archive => "archive",
            Action::CommenceOperation => "commence-operation",
            Action::ConcludeOperation => "conclude-operation",
            Action::AbortOperation => "abort-operation",
            Action::AppendOperationLog => "append-operation-log",
            Action::RequestAsset => "request-asset",
            Action::DecideRequisition => "decide-requisition",
            Action::ReconcileMembership => "reconcile-membership",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
