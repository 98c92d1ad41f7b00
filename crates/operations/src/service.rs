//! Command service for the operation lifecycle.
//!
//! Every mutation follows the same shape: evaluate the policy table, then
//! any state-dependent rule, then the entity guard — all before a write —
//! and only afterwards fan out audit/notification side effects through the
//! best-effort dispatcher.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use tradecraft_auth::{policy, Action, Actor, DeleteDisposition, Role};
use tradecraft_core::{DomainError, DomainResult, Entity, FactionId, OperationId, ProfileId};
use tradecraft_dispatch::{Dispatcher, TargetRef};
use tradecraft_ledger::ResourceLedger;

use crate::operation::{
    Assignment, CollateralRisk, LogEntry, Operation, OperationPatch, OperationStatus, Outcome,
};

/// Input for creating an operation in PLANNING.
#[derive(Debug, Clone, Default)]
pub struct OperationDraft {
    pub codename: String,
    pub objective: String,
    pub success_probability: Option<u8>,
    pub collateral_risk: Option<CollateralRisk>,
    /// Faction targets attached at creation (pre-populated workflows).
    pub targets: Vec<FactionId>,
}

/// Holds the operation book and orchestrates lifecycle mutations.
pub struct OperationsService {
    operations: Mutex<HashMap<OperationId, Operation>>,
    ledger: Arc<ResourceLedger>,
    dispatcher: Arc<Dispatcher>,
}

impl OperationsService {
    pub fn new(ledger: Arc<ResourceLedger>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            operations: Mutex::new(HashMap::new()),
            ledger,
            dispatcher,
        }
    }

    /// Create a new operation in PLANNING. Codenames are unique across the
    /// whole book, archived operations included.
    pub fn create(&self, draft: OperationDraft, actor: &Actor) -> DomainResult<Operation> {
        policy::require(actor, Action::Create)?;

        let mut op = Operation::new(draft.codename, draft.objective)?;
        let now = Utc::now();
        op.apply_patch(
            OperationPatch {
                success_probability: draft.success_probability,
                collateral_risk: draft.collateral_risk,
                ..OperationPatch::default()
            },
            now,
        )?;
        if !draft.targets.is_empty() {
            op.set_targets(draft.targets.into_iter().collect(), BTreeSet::new(), now)?;
        }

        let mut operations = self.lock()?;
        if operations
            .values()
            .any(|existing| existing.codename() == op.codename())
        {
            return Err(DomainError::conflict("codename is already in use"));
        }
        let snapshot = op.clone();
        operations.insert(*op.id(), op);
        drop(operations);

        tracing::info!(codename = snapshot.codename(), "operation created");
        self.dispatcher.audit(
            actor,
            format!("Created operation '{}'", snapshot.codename()),
            TargetRef::Operation(*snapshot.id()),
        );
        Ok(snapshot)
    }

    /// Fetch one operation. Archived operations are visible only to the
    /// HQ/PROTECTOR tiers; everyone else sees `NotFound`.
    pub fn get(&self, id: OperationId, actor: &Actor) -> DomainResult<Operation> {
        policy::require(actor, Action::Read)?;
        let operations = self.lock()?;
        operations
            .get(&id)
            .filter(|op| !op.is_archived() || can_see_archived(actor.role))
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    /// All operations visible to the actor, newest first.
    pub fn list(&self, actor: &Actor) -> DomainResult<Vec<Operation>> {
        policy::require(actor, Action::Read)?;
        let operations = self.lock()?;
        let mut visible: Vec<Operation> = operations
            .values()
            .filter(|op| !op.is_archived() || can_see_archived(actor.role))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(visible)
    }

    /// Patch briefing fields. HEIR may only edit PLANNING-stage operations;
    /// that rule reads current state and is checked before any write.
    pub fn update(
        &self,
        id: OperationId,
        patch: OperationPatch,
        actor: &Actor,
    ) -> DomainResult<Operation> {
        policy::require(actor, Action::Update)?;

        let mut operations = self.lock()?;
        let in_planning = operations
            .get(&id)
            .ok_or(DomainError::NotFound)?
            .status()
            .is_planning();
        policy::require_planning_stage(actor, in_planning)?;

        if let Some(new_codename) = &patch.codename {
            let taken = operations
                .values()
                .any(|other| other.id() != &id && other.codename() == new_codename);
            if taken {
                return Err(DomainError::conflict("codename is already in use"));
            }
        }

        let op = operations.get_mut(&id).ok_or(DomainError::NotFound)?;
        op.apply_patch(patch, Utc::now())?;
        let snapshot = op.clone();
        drop(operations);

        self.dispatcher.audit(
            actor,
            format!("Updated operation '{}'", snapshot.codename()),
            TargetRef::Operation(id),
        );
        Ok(snapshot)
    }

    /// PLANNING → ACTIVE. PROTECTOR only.
    pub fn commence(&self, id: OperationId, actor: &Actor) -> DomainResult<Operation> {
        policy::require(actor, Action::CommenceOperation)?;

        let mut operations = self.lock()?;
        let op = operations.get_mut(&id).ok_or(DomainError::NotFound)?;
        op.commence(Utc::now())?;
        let snapshot = op.clone();
        drop(operations);

        tracing::info!(codename = snapshot.codename(), "operation commenced");
        self.dispatcher.audit(
            actor,
            format!("Commenced operation '{}'", snapshot.codename()),
            TargetRef::Operation(id),
        );
        self.notify_status_change(&snapshot, format!("Operation '{}' commenced", snapshot.codename()));
        Ok(snapshot)
    }

    /// ACTIVE → CONCLUDED_*. Releases every approved requisition.
    pub fn conclude(
        &self,
        id: OperationId,
        outcome: Outcome,
        report: impl Into<String>,
        actor: &Actor,
    ) -> DomainResult<Operation> {
        policy::require(actor, Action::ConcludeOperation)?;

        let mut operations = self.lock()?;
        let op = operations.get_mut(&id).ok_or(DomainError::NotFound)?;
        op.conclude(outcome, report, Utc::now())?;
        let snapshot = op.clone();
        drop(operations);

        self.ledger.release_all_for(id)?;

        tracing::info!(codename = snapshot.codename(), %outcome, "operation concluded");
        self.dispatcher.audit(
            actor,
            format!("Concluded operation '{}' ({})", snapshot.codename(), outcome),
            TargetRef::Operation(id),
        );
        self.notify_status_change(
            &snapshot,
            format!("Operation '{}' concluded: {}", snapshot.codename(), outcome),
        );
        Ok(snapshot)
    }

    /// ACTIVE → COMPROMISED. Releases every approved requisition.
    pub fn abort(&self, id: OperationId, reason: &str, actor: &Actor) -> DomainResult<Operation> {
        policy::require(actor, Action::AbortOperation)?;

        let mut operations = self.lock()?;
        let op = operations.get_mut(&id).ok_or(DomainError::NotFound)?;
        op.abort(reason, Utc::now())?;
        let snapshot = op.clone();
        drop(operations);

        self.ledger.release_all_for(id)?;

        self.dispatcher.audit(
            actor,
            format!("Aborted operation '{}'", snapshot.codename()),
            TargetRef::Operation(id),
        );
        self.notify_status_change(&snapshot, format!("Operation '{}' aborted", snapshot.codename()));
        Ok(snapshot)
    }

    /// Replace faction and profile target sets in one go. PLANNING only.
    pub fn set_targets(
        &self,
        id: OperationId,
        factions: Vec<FactionId>,
        profiles: Vec<ProfileId>,
        actor: &Actor,
    ) -> DomainResult<Operation> {
        policy::require(actor, Action::Update)?;

        let mut operations = self.lock()?;
        let op = operations.get_mut(&id).ok_or(DomainError::NotFound)?;
        policy::require_planning_stage(actor, op.status().is_planning())?;
        op.set_targets(
            factions.into_iter().collect(),
            profiles.into_iter().collect(),
            Utc::now(),
        )?;
        let snapshot = op.clone();
        drop(operations);

        self.dispatcher.audit(
            actor,
            format!("Updated targets for operation '{}'", snapshot.codename()),
            TargetRef::Operation(id),
        );
        Ok(snapshot)
    }

    /// Replace the personnel roster. PLANNING only.
    pub fn set_personnel(
        &self,
        id: OperationId,
        assignments: Vec<Assignment>,
        actor: &Actor,
    ) -> DomainResult<Operation> {
        policy::require(actor, Action::Update)?;

        let mut operations = self.lock()?;
        let op = operations.get_mut(&id).ok_or(DomainError::NotFound)?;
        policy::require_planning_stage(actor, op.status().is_planning())?;
        op.set_personnel(assignments, Utc::now())?;
        let snapshot = op.clone();
        drop(operations);

        self.dispatcher.audit(
            actor,
            format!("Updated personnel roster for operation '{}'", snapshot.codename()),
            TargetRef::Operation(id),
        );
        Ok(snapshot)
    }

    /// Append a log line to an ACTIVE operation.
    pub fn append_log(
        &self,
        id: OperationId,
        message: impl Into<String>,
        actor: &Actor,
    ) -> DomainResult<LogEntry> {
        policy::require(actor, Action::AppendOperationLog)?;

        let mut operations = self.lock()?;
        let op = operations.get_mut(&id).ok_or(DomainError::NotFound)?;
        let entry = op.append_log(actor.user, message, Utc::now())?;
        let codename = op.codename().to_string();
        drop(operations);

        self.dispatcher.audit(
            actor,
            format!("Log entry added to '{codename}'"),
            TargetRef::Operation(id),
        );
        Ok(entry)
    }

    /// Role-resolved delete: HQ/PROTECTOR purge, HEIR archives, anyone else
    /// is denied — and the denial itself lands in the audit trail.
    pub fn delete(&self, id: OperationId, actor: &Actor) -> DomainResult<DeleteDisposition> {
        let mut operations = self.lock()?;
        let codename = operations
            .get(&id)
            .ok_or(DomainError::NotFound)?
            .codename()
            .to_string();

        let Some(action) = policy::resolve_delete(actor.role) else {
            drop(operations);
            self.dispatcher.audit(
                actor,
                format!("Denied attempt to delete operation '{codename}'"),
                TargetRef::Operation(id),
            );
            return Err(DomainError::forbidden(
                "you do not have permission to delete operations",
            ));
        };
        policy::require(actor, action)?;

        match action {
            Action::Archive => {
                if let Some(op) = operations.get_mut(&id) {
                    op.archive(Utc::now());
                }
                drop(operations);
                self.dispatcher.audit(
                    actor,
                    format!("Archived operation '{codename}'"),
                    TargetRef::Operation(id),
                );
                Ok(DeleteDisposition::Archived)
            }
            _ => {
                // Hard delete cascades owned logs/assignments with the record;
                // shared assets are handed back to the pool first.
                operations.remove(&id);
                drop(operations);
                self.ledger.release_all_for(id)?;
                self.dispatcher.audit(
                    actor,
                    format!("Permanently deleted operation '{codename}'"),
                    TargetRef::Operation(id),
                );
                Ok(DeleteDisposition::Purged)
            }
        }
    }

    fn notify_status_change(&self, op: &Operation, message: String) {
        let metadata = serde_json::json!({
            "operation_id": op.id().to_string(),
            "status": op.status().as_str(),
        });
        self.dispatcher.notify(&Role::COMMAND_TIER, message, metadata);
    }

    fn lock(&self) -> DomainResult<MutexGuard<'_, HashMap<OperationId, Operation>>> {
        self.operations
            .lock()
            .map_err(|_| DomainError::conflict("operation book poisoned"))
    }
}

fn can_see_archived(role: Role) -> bool {
    matches!(role, Role::Hq | Role::Protector)
}
