//! The resource ledger service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use tradecraft_auth::{policy, Action, Actor};
use tradecraft_core::{AssetId, DomainError, DomainResult, OperationId, RequisitionId};
use tradecraft_dispatch::{Dispatcher, TargetRef};

use crate::asset::{Asset, AssetStatus};
use crate::requisition::Requisition;

#[derive(Debug, Default)]
struct LedgerState {
    assets: HashMap<AssetId, Asset>,
    requisitions: HashMap<RequisitionId, Requisition>,
}

/// Tracks assets and their requisition workflow.
///
/// One interior lock covers both maps, so every mutation — in particular the
/// requisition-APPROVED + asset-ALLOCATED pair — is applied all-or-nothing,
/// and competing approvals for the same asset serialize on the lock.
pub struct ResourceLedger {
    state: Mutex<LedgerState>,
    dispatcher: Arc<Dispatcher>,
}

impl ResourceLedger {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            dispatcher,
        }
    }

    /// Add an asset to the ledger (inventory intake; not role-gated here —
    /// asset CRUD is ordinary case-entity plumbing handled by the caller).
    pub fn register(&self, asset: Asset) -> DomainResult<AssetId> {
        let mut state = self.lock()?;
        let id = asset.id;
        if state.assets.contains_key(&id) {
            return Err(DomainError::conflict("asset already registered"));
        }
        state.assets.insert(id, asset);
        Ok(id)
    }

    pub fn asset(&self, id: AssetId) -> DomainResult<Asset> {
        let state = self.lock()?;
        state.assets.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    /// Assets currently in the given status, sorted by name.
    pub fn assets_with_status(&self, status: AssetStatus) -> DomainResult<Vec<Asset>> {
        let state = self.lock()?;
        let mut assets: Vec<Asset> = state
            .assets
            .values()
            .filter(|asset| asset.status == status)
            .cloned()
            .collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }

    pub fn requisition(&self, id: RequisitionId) -> DomainResult<Requisition> {
        let state = self.lock()?;
        state
            .requisitions
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    /// All requisitions filed for an operation, newest first.
    pub fn requisitions_for(&self, operation_id: OperationId) -> DomainResult<Vec<Requisition>> {
        let state = self.lock()?;
        let mut reqs: Vec<Requisition> = state
            .requisitions
            .values()
            .filter(|req| req.operation_id == operation_id)
            .cloned()
            .collect();
        reqs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reqs)
    }

    /// File a PENDING requisition tying `asset_id` to `operation_id`.
    ///
    /// Fails with `Conflict` if the asset is not AVAILABLE or an outstanding
    /// requisition already exists for the same (operation, asset) pair.
    pub fn request(
        &self,
        operation_id: OperationId,
        asset_id: AssetId,
        note: impl Into<String>,
        actor: &Actor,
    ) -> DomainResult<Requisition> {
        policy::require(actor, Action::RequestAsset)?;

        let mut state = self.lock()?;
        let asset = state.assets.get(&asset_id).ok_or(DomainError::NotFound)?;
        if !asset.is_available() {
            return Err(DomainError::conflict("asset is not available"));
        }
        let duplicate = state.requisitions.values().any(|req| {
            req.operation_id == operation_id && req.asset_id == asset_id && req.is_outstanding()
        });
        if duplicate {
            return Err(DomainError::conflict(
                "an outstanding requisition already exists for this asset",
            ));
        }

        let asset_name = asset.name.clone();
        let req = Requisition::new(operation_id, asset_id, actor.user, note);
        let snapshot = req.clone();
        state.requisitions.insert(req.id, req);
        drop(state);

        tracing::info!(%operation_id, %asset_id, "requisition filed");
        self.dispatcher.audit(
            actor,
            format!("Requested asset '{asset_name}' for operation {operation_id}"),
            TargetRef::Operation(operation_id),
        );
        Ok(snapshot)
    }

    /// Approve a PENDING requisition: stamps the decision and allocates the
    /// asset in the same critical section.
    pub fn approve(&self, id: RequisitionId, actor: &Actor) -> DomainResult<Requisition> {
        policy::require(actor, Action::DecideRequisition)?;

        let mut state = self.lock()?;
        // All guards run before either write so a rejection is side-effect free.
        let req = state.requisitions.get(&id).ok_or(DomainError::NotFound)?;
        req.ensure_pending()?;
        let asset_id = req.asset_id;
        let operation_id = req.operation_id;
        let asset = state.assets.get(&asset_id).ok_or(DomainError::NotFound)?;
        if !asset.is_available() {
            return Err(DomainError::conflict("asset is no longer available"));
        }
        let asset_name = asset.name.clone();

        let now = Utc::now();
        if let Some(req) = state.requisitions.get_mut(&id) {
            req.mark_approved(actor.user, now);
        }
        if let Some(asset) = state.assets.get_mut(&asset_id) {
            asset.status = AssetStatus::Allocated;
        }
        let snapshot = state
            .requisitions
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;
        drop(state);

        tracing::info!(%operation_id, %asset_id, "requisition approved");
        self.dispatcher.audit(
            actor,
            format!("Approved asset '{asset_name}' for operation {operation_id}"),
            TargetRef::Operation(operation_id),
        );
        Ok(snapshot)
    }

    /// Deny a PENDING requisition. The asset's status is left unchanged.
    pub fn deny(&self, id: RequisitionId, actor: &Actor) -> DomainResult<Requisition> {
        policy::require(actor, Action::DecideRequisition)?;

        let mut state = self.lock()?;
        let req = state.requisitions.get(&id).ok_or(DomainError::NotFound)?;
        req.ensure_pending()?;
        let asset_id = req.asset_id;
        let operation_id = req.operation_id;
        let asset_name = state
            .assets
            .get(&asset_id)
            .map(|asset| asset.name.clone())
            .unwrap_or_else(|| asset_id.to_string());

        let now = Utc::now();
        if let Some(req) = state.requisitions.get_mut(&id) {
            req.mark_denied(actor.user, now);
        }
        let snapshot = state
            .requisitions
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;
        drop(state);

        self.dispatcher.audit(
            actor,
            format!("Denied asset '{asset_name}' for operation {operation_id}"),
            TargetRef::Operation(operation_id),
        );
        Ok(snapshot)
    }

    /// Reset every asset with an APPROVED requisition for `operation_id`
    /// back to AVAILABLE. Invoked by the lifecycle on conclusion or abort.
    ///
    /// Idempotent: assets already released are skipped, so re-invocation is
    /// a no-op. Returns the ids of assets actually released.
    pub fn release_all_for(&self, operation_id: OperationId) -> DomainResult<Vec<AssetId>> {
        let mut state = self.lock()?;
        let approved_assets: Vec<AssetId> = state
            .requisitions
            .values()
            .filter(|req| {
                req.operation_id == operation_id
                    && req.status == crate::RequisitionStatus::Approved
            })
            .map(|req| req.asset_id)
            .collect();

        let mut released = Vec::new();
        for asset_id in approved_assets {
            if let Some(asset) = state.assets.get_mut(&asset_id) {
                if asset.status == AssetStatus::Allocated {
                    asset.status = AssetStatus::Available;
                    released.push(asset_id);
                }
            }
        }
        if !released.is_empty() {
            tracing::info!(%operation_id, count = released.len(), "released operation assets");
        }
        Ok(released)
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, LedgerState>> {
        self.state
            .lock()
            .map_err(|_| DomainError::conflict("ledger state poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;
    use tradecraft_auth::Role;
    use tradecraft_core::UserId;
    use tradecraft_dispatch::RecordingSink;

    fn ledger() -> (ResourceLedger, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = Arc::new(Dispatcher::new(sink.clone(), sink.clone()));
        (ResourceLedger::new(dispatcher), sink)
    }

    fn protector() -> Actor {
        Actor::new(UserId::new(), Role::Protector)
    }

    fn heir() -> Actor {
        Actor::new(UserId::new(), Role::Heir)
    }

    fn seed_asset(ledger: &ResourceLedger) -> AssetId {
        ledger
            .register(Asset::new("Armored Sedan", AssetKind::Vehicle).unwrap())
            .unwrap()
    }

    #[test]
    fn request_creates_pending_requisition() {
        let (ledger, sink) = ledger();
        let asset_id = seed_asset(&ledger);
        let op = OperationId::new();

        let req = ledger.request(op, asset_id, "surveillance run", &heir()).unwrap();
        assert!(req.is_pending());
        assert_eq!(req.asset_id, asset_id);
        assert_eq!(req.note, "surveillance run");
        assert_eq!(sink.audit_entries().len(), 1);
    }

    #[test]
    fn request_rejects_unavailable_asset() {
        let (ledger, _) = ledger();
        let mut asset = Asset::new("Listening Post", AssetKind::Equipment).unwrap();
        asset.status = AssetStatus::Maintenance;
        let asset_id = ledger.register(asset).unwrap();

        let err = ledger.request(OperationId::new(), asset_id, "", &heir()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn duplicate_outstanding_request_conflicts() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);
        let op = OperationId::new();

        ledger.request(op, asset_id, "", &heir()).unwrap();
        let err = ledger.request(op, asset_id, "", &heir()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn denied_requisition_unblocks_a_fresh_request() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);
        let op = OperationId::new();

        let req = ledger.request(op, asset_id, "", &heir()).unwrap();
        ledger.deny(req.id, &protector()).unwrap();
        assert_eq!(ledger.asset(asset_id).unwrap().status, AssetStatus::Available);

        // The (operation, asset) pair is free again after the denial.
        assert!(ledger.request(op, asset_id, "", &heir()).is_ok());
    }

    #[test]
    fn approve_allocates_asset_and_stamps_decision() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);
        let approver = protector();

        let req = ledger.request(OperationId::new(), asset_id, "", &heir()).unwrap();
        let approved = ledger.approve(req.id, &approver).unwrap();

        assert_eq!(approved.status, crate::RequisitionStatus::Approved);
        assert_eq!(approved.approved_by, Some(approver.user));
        assert!(approved.decided_at.is_some());
        assert_eq!(ledger.asset(asset_id).unwrap().status, AssetStatus::Allocated);
    }

    #[test]
    fn second_approve_conflicts_and_leaves_asset_alone() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);

        let req = ledger.request(OperationId::new(), asset_id, "", &heir()).unwrap();
        ledger.approve(req.id, &protector()).unwrap();

        let err = ledger.approve(req.id, &protector()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(ledger.asset(asset_id).unwrap().status, AssetStatus::Allocated);
    }

    #[test]
    fn competing_approvals_for_one_asset_allocate_once() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);

        // Two operations race for the same asset; both requisitions are filed
        // while it is still AVAILABLE.
        let req_a = ledger.request(OperationId::new(), asset_id, "", &heir()).unwrap();
        let req_b = ledger.request(OperationId::new(), asset_id, "", &heir()).unwrap();

        assert!(ledger.approve(req_a.id, &protector()).is_ok());
        let err = ledger.approve(req_b.id, &protector()).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn only_protector_decides() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);
        let req = ledger.request(OperationId::new(), asset_id, "", &heir()).unwrap();

        for actor in [heir(), Actor::new(UserId::new(), Role::Hq), Actor::new(UserId::new(), Role::Observer)] {
            let err = ledger.approve(req.id, &actor).unwrap_err();
            assert!(matches!(err, DomainError::Forbidden(_)), "{}", actor.role);
        }
    }

    #[test]
    fn observer_may_not_request() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);
        let err = ledger
            .request(OperationId::new(), asset_id, "", &Actor::new(UserId::new(), Role::Observer))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn release_all_is_idempotent() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);
        let op = OperationId::new();

        let req = ledger.request(op, asset_id, "", &heir()).unwrap();
        ledger.approve(req.id, &protector()).unwrap();

        let released = ledger.release_all_for(op).unwrap();
        assert_eq!(released, vec![asset_id]);
        assert_eq!(ledger.asset(asset_id).unwrap().status, AssetStatus::Available);

        // Second sweep finds nothing to do.
        assert!(ledger.release_all_for(op).unwrap().is_empty());
    }

    #[test]
    fn release_with_no_approvals_is_a_noop() {
        let (ledger, _) = ledger();
        let asset_id = seed_asset(&ledger);
        let op = OperationId::new();
        ledger.request(op, asset_id, "", &heir()).unwrap();

        assert!(ledger.release_all_for(op).unwrap().is_empty());
        assert_eq!(ledger.asset(asset_id).unwrap().status, AssetStatus::Available);
    }
}
