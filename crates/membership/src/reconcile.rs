//! Faction directory and batch membership reconciliation.
//!
//! Each faction's membership map sits behind its own lock; a reconcile call
//! holds that lock for the whole add/update/remove batch so concurrent
//! batches against the same faction serialize. Lock order is always the
//! directory lock first, one faction record second.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use tradecraft_auth::{policy, Action, Actor, DeleteDisposition, Role};
use tradecraft_core::{DomainError, DomainResult, Entity, FactionId, ProfileId};
use tradecraft_dispatch::{Dispatcher, TargetRef};

use crate::faction::{Affiliation, Faction, HistorySnapshot, Membership, ThreatLevel};

/// Input for creating a faction.
#[derive(Debug, Clone, Default)]
pub struct FactionDraft {
    pub name: String,
    pub description: String,
    pub threat_level: Option<ThreatLevel>,
}

/// Partial update to a faction's descriptive fields.
#[derive(Debug, Clone, Default)]
pub struct FactionPatch {
    pub name: Option<String>,
    pub threat_level: Option<ThreatLevel>,
    pub description: Option<String>,
}

/// One add/update instruction in a reconcile batch. The affiliation arrives
/// as raw text and is normalized on intake.
#[derive(Debug, Clone)]
pub struct MemberEntry {
    pub profile_id: ProfileId,
    pub affiliation: String,
}

impl MemberEntry {
    pub fn new(profile_id: ProfileId, affiliation: impl Into<String>) -> Self {
        Self {
            profile_id,
            affiliation: affiliation.into(),
        }
    }
}

/// Result of a reconcile batch: a distinguishable no-op, with the final
/// member list (sorted by profile id) either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { members: Vec<Membership> },
    NoChange { members: Vec<Membership> },
}

impl ReconcileOutcome {
    pub fn members(&self) -> &[Membership] {
        match self {
            ReconcileOutcome::Applied { members } | ReconcileOutcome::NoChange { members } => {
                members
            }
        }
    }

    pub fn changed(&self) -> bool {
        matches!(self, ReconcileOutcome::Applied { .. })
    }
}

struct FactionRecord {
    faction: Faction,
    memberships: BTreeMap<ProfileId, Membership>,
    history: Vec<HistorySnapshot>,
}

#[derive(Default)]
struct DirectoryState {
    factions: HashMap<FactionId, Arc<Mutex<FactionRecord>>>,
    names: HashMap<String, FactionId>,
}

/// Holds every tracked faction, its membership map and history.
pub struct FactionDirectory {
    state: Mutex<DirectoryState>,
    dispatcher: Arc<Dispatcher>,
}

impl FactionDirectory {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            state: Mutex::new(DirectoryState::default()),
            dispatcher,
        }
    }

    /// Create a faction. Names are unique directory-wide.
    pub fn create(&self, draft: FactionDraft, actor: &Actor) -> DomainResult<Faction> {
        policy::require(actor, Action::Create)?;

        let mut faction = Faction::new(draft.name, draft.description)?;
        let now = Utc::now();
        if let Some(level) = draft.threat_level {
            faction.set_threat_level(level, now);
        }

        let mut state = self.lock_directory()?;
        if state.names.contains_key(faction.name()) {
            return Err(DomainError::conflict("faction name is already in use"));
        }
        let id = *faction.id();
        state.names.insert(faction.name().to_string(), id);
        state.factions.insert(
            id,
            Arc::new(Mutex::new(FactionRecord {
                faction: faction.clone(),
                memberships: BTreeMap::new(),
                history: Vec::new(),
            })),
        );
        drop(state);

        tracing::info!(name = faction.name(), "faction created");
        self.dispatcher.audit(
            actor,
            format!("Created faction '{}'", faction.name()),
            TargetRef::Faction(id),
        );
        Ok(faction)
    }

    /// Fetch one faction; archived factions are visible only to HQ/PROTECTOR.
    pub fn faction(&self, id: FactionId, actor: &Actor) -> DomainResult<Faction> {
        policy::require(actor, Action::Read)?;
        let record = self.record(id)?;
        let record = lock_record(&record)?;
        if record.faction.is_archived() && !can_see_archived(actor.role) {
            return Err(DomainError::NotFound);
        }
        Ok(record.faction.clone())
    }

    /// Factions visible to the actor, sorted by name.
    pub fn list(&self, actor: &Actor) -> DomainResult<Vec<Faction>> {
        policy::require(actor, Action::Read)?;
        let state = self.lock_directory()?;
        let records: Vec<Arc<Mutex<FactionRecord>>> = state.factions.values().cloned().collect();
        drop(state);

        let mut factions = Vec::with_capacity(records.len());
        for record in records {
            let record = lock_record(&record)?;
            if !record.faction.is_archived() || can_see_archived(actor.role) {
                factions.push(record.faction.clone());
            }
        }
        factions.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(factions)
    }

    /// Current members, sorted by profile id.
    pub fn members(&self, id: FactionId, actor: &Actor) -> DomainResult<Vec<Membership>> {
        policy::require(actor, Action::Read)?;
        let record = self.record(id)?;
        let record = lock_record(&record)?;
        if record.faction.is_archived() && !can_see_archived(actor.role) {
            return Err(DomainError::NotFound);
        }
        Ok(record.memberships.values().cloned().collect())
    }

    /// History snapshots in chronological order.
    pub fn history(&self, id: FactionId, actor: &Actor) -> DomainResult<Vec<HistorySnapshot>> {
        policy::require(actor, Action::Read)?;
        let record = self.record(id)?;
        let record = lock_record(&record)?;
        if record.faction.is_archived() && !can_see_archived(actor.role) {
            return Err(DomainError::NotFound);
        }
        Ok(record.history.clone())
    }

    /// Patch descriptive fields. A threat-level change appends a history
    /// snapshot.
    pub fn update(&self, id: FactionId, patch: FactionPatch, actor: &Actor) -> DomainResult<Faction> {
        policy::require(actor, Action::Update)?;

        let mut state = self.lock_directory()?;
        let record = state.factions.get(&id).cloned().ok_or(DomainError::NotFound)?;
        let mut record = lock_record(&record)?;
        let now = Utc::now();

        if let Some(name) = patch.name {
            if name != record.faction.name() {
                if state.names.contains_key(&name) {
                    return Err(DomainError::conflict("faction name is already in use"));
                }
                // Rename first; the index is only rewritten once the new name
                // is known to be valid.
                let old_name = record.faction.name().to_string();
                record.faction.rename(name.clone(), now)?;
                state.names.remove(&old_name);
                state.names.insert(name, id);
            }
        }
        drop(state);

        if let Some(description) = patch.description {
            record.faction.set_description(description, now);
        }
        if let Some(level) = patch.threat_level {
            if level != record.faction.threat_level() {
                record.faction.set_threat_level(level, now);
                let snapshot = HistorySnapshot {
                    threat_level: level,
                    member_count: record.memberships.len(),
                    updated_by: actor.user,
                    timestamp: now,
                };
                record.history.push(snapshot);
            }
        }
        let snapshot = record.faction.clone();
        drop(record);

        self.dispatcher.audit(
            actor,
            format!("Updated faction '{}'", snapshot.name()),
            TargetRef::Faction(id),
        );
        Ok(snapshot)
    }

    /// Role-resolved delete, mirroring the operation book: HQ/PROTECTOR
    /// purge, HEIR archives, anyone else is denied with the denial audited.
    pub fn delete(&self, id: FactionId, actor: &Actor) -> DomainResult<DeleteDisposition> {
        let mut state = self.lock_directory()?;
        let record = state.factions.get(&id).cloned().ok_or(DomainError::NotFound)?;
        let mut record = lock_record(&record)?;
        let name = record.faction.name().to_string();

        let Some(action) = policy::resolve_delete(actor.role) else {
            drop(record);
            drop(state);
            self.dispatcher.audit(
                actor,
                format!("Denied attempt to delete faction '{name}'"),
                TargetRef::Faction(id),
            );
            return Err(DomainError::forbidden(
                "you do not have permission to delete factions",
            ));
        };
        policy::require(actor, action)?;

        match action {
            Action::Archive => {
                record.faction.archive(Utc::now());
                drop(record);
                drop(state);
                self.dispatcher.audit(
                    actor,
                    format!("Archived faction '{name}'"),
                    TargetRef::Faction(id),
                );
                Ok(DeleteDisposition::Archived)
            }
            _ => {
                drop(record);
                state.factions.remove(&id);
                state.names.remove(&name);
                drop(state);
                self.dispatcher.audit(
                    actor,
                    format!("Permanently deleted faction '{name}'"),
                    TargetRef::Faction(id),
                );
                Ok(DeleteDisposition::Purged)
            }
        }
    }

    /// Apply an add/update/remove batch against one faction's membership.
    ///
    /// - adds are skipped for profiles already in the faction
    /// - updates apply to existing members and to members added earlier in
    ///   the same batch, so an update wins over an add for the same profile
    /// - a second identical call reports [`ReconcileOutcome::NoChange`]
    pub fn reconcile(
        &self,
        id: FactionId,
        add: Vec<MemberEntry>,
        updates: Vec<MemberEntry>,
        remove: Vec<ProfileId>,
        actor: &Actor,
    ) -> DomainResult<ReconcileOutcome> {
        policy::require(actor, Action::ReconcileMembership)?;

        let record = self.record(id)?;
        let mut record = lock_record(&record)?;
        if record.faction.is_archived() && !can_see_archived(actor.role) {
            return Err(DomainError::NotFound);
        }

        let now = Utc::now();
        let name = record.faction.name().to_string();
        let mut changed = false;
        let mut audit_lines = Vec::new();

        for entry in add {
            if record.memberships.contains_key(&entry.profile_id) {
                continue;
            }
            let affiliation = Affiliation::normalize(&entry.affiliation);
            record.memberships.insert(
                entry.profile_id,
                Membership::new(entry.profile_id, affiliation, now),
            );
            changed = true;
            audit_lines.push(format!(
                "Added profile '{}' to faction '{name}'",
                entry.profile_id
            ));
        }

        for entry in updates {
            let Some(membership) = record.memberships.get_mut(&entry.profile_id) else {
                continue;
            };
            let desired = Affiliation::normalize(&entry.affiliation);
            if membership.affiliation != desired {
                membership.affiliation = desired;
                membership.updated_at = now;
                changed = true;
                audit_lines.push(format!(
                    "Updated affiliation for profile '{}' in '{name}'",
                    entry.profile_id
                ));
            }
        }

        let mut removed = 0usize;
        for profile_id in remove {
            if record.memberships.remove(&profile_id).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            changed = true;
            audit_lines.push(format!("Removed {removed} members from faction '{name}'"));
        }

        if changed {
            let snapshot = HistorySnapshot {
                threat_level: record.faction.threat_level(),
                member_count: record.memberships.len(),
                updated_by: actor.user,
                timestamp: now,
            };
            record.history.push(snapshot);
        }
        let members: Vec<Membership> = record.memberships.values().cloned().collect();
        drop(record);

        for line in audit_lines {
            self.dispatcher.audit(actor, line, TargetRef::Faction(id));
        }

        if changed {
            tracing::info!(faction = %name, members = members.len(), "membership reconciled");
            Ok(ReconcileOutcome::Applied { members })
        } else {
            Ok(ReconcileOutcome::NoChange { members })
        }
    }

    fn record(&self, id: FactionId) -> DomainResult<Arc<Mutex<FactionRecord>>> {
        let state = self.lock_directory()?;
        state.factions.get(&id).cloned().ok_or(DomainError::NotFound)
    }

    fn lock_directory(&self) -> DomainResult<MutexGuard<'_, DirectoryState>> {
        self.state
            .lock()
            .map_err(|_| DomainError::conflict("faction directory poisoned"))
    }
}

fn lock_record(record: &Arc<Mutex<FactionRecord>>) -> DomainResult<MutexGuard<'_, FactionRecord>> {
    record
        .lock()
        .map_err(|_| DomainError::conflict("faction record poisoned"))
}

fn can_see_archived(role: Role) -> bool {
    matches!(role, Role::Hq | Role::Protector)
}
