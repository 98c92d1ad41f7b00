use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradecraft_core::{AssetId, DomainError, DomainResult, Entity, OperationId, RequisitionId, UserId};

/// Decision state of a requisition. PENDING is the only non-terminal state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequisitionStatus {
    Pending,
    Approved,
    Denied,
}

/// A request to allocate one asset to one operation.
///
/// `approved_by` and `decided_at` are set iff the status has left PENDING.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requisition {
    pub id: RequisitionId,
    pub operation_id: OperationId,
    pub asset_id: AssetId,
    pub requested_by: UserId,
    pub status: RequisitionStatus,
    pub approved_by: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl Requisition {
    pub fn new(
        operation_id: OperationId,
        asset_id: AssetId,
        requested_by: UserId,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: RequisitionId::new(),
            operation_id,
            asset_id,
            requested_by,
            status: RequisitionStatus::Pending,
            approved_by: None,
            decided_at: None,
            note: note.into(),
            created_at: Utc::now(),
        }
    }

    /// PENDING or APPROVED — i.e. still blocking a fresh request for the
    /// same (operation, asset) pair.
    pub fn is_outstanding(&self) -> bool {
        matches!(self.status, RequisitionStatus::Pending | RequisitionStatus::Approved)
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequisitionStatus::Pending
    }

    pub(crate) fn ensure_pending(&self) -> DomainResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(DomainError::conflict("requisition is not pending"))
        }
    }

    pub(crate) fn mark_approved(&mut self, approver: UserId, decided_at: DateTime<Utc>) {
        self.status = RequisitionStatus::Approved;
        self.approved_by = Some(approver);
        self.decided_at = Some(decided_at);
    }

    pub(crate) fn mark_denied(&mut self, approver: UserId, decided_at: DateTime<Utc>) {
        self.status = RequisitionStatus::Denied;
        self.approved_by = Some(approver);
        self.decided_at = Some(decided_at);
    }
}

impl Entity for Requisition {
    type Id = RequisitionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
