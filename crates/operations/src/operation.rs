use core::str::FromStr;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradecraft_core::{AgentId, DomainError, DomainResult, Entity, FactionId, OperationId, ProfileId, UserId};

/// Lifecycle status of an operation.
///
/// PLANNING is initial; the three CONCLUDED/COMPROMISED variants are
/// terminal. No transition skips PLANNING or re-enters a prior state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Planning,
    Active,
    ConcludedSuccess,
    ConcludedFailure,
    Compromised,
}

impl OperationStatus {
    pub fn is_planning(self) -> bool {
        self == OperationStatus::Planning
    }

    pub fn is_active(self) -> bool {
        self == OperationStatus::Active
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationStatus::ConcludedSuccess
                | OperationStatus::ConcludedFailure
                | OperationStatus::Compromised
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationStatus::Planning => "PLANNING",
            OperationStatus::Active => "ACTIVE",
            OperationStatus::ConcludedSuccess => "CONCLUDED_SUCCESS",
            OperationStatus::ConcludedFailure => "CONCLUDED_FAILURE",
            OperationStatus::Compromised => "COMPROMISED",
        }
    }
}

impl core::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome supplied when concluding an ACTIVE operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    Failure,
}

impl FromStr for Outcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Outcome::Success),
            "FAILURE" => Ok(Outcome::Failure),
            other => Err(DomainError::validation(format!(
                "invalid outcome '{other}': use SUCCESS or FAILURE"
            ))),
        }
    }
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
        })
    }
}

/// Assessed collateral risk of an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollateralRisk {
    Low,
    Medium,
    High,
    Critical,
}

/// Personnel assignment carried on the operation roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub agent_id: AgentId,
    pub role_in_op: String,
}

impl Assignment {
    pub const DEFAULT_ROLE: &'static str = "Field Agent";

    pub fn new(agent_id: AgentId, role_in_op: impl Into<String>) -> Self {
        let role_in_op = role_in_op.into();
        let role_in_op = if role_in_op.trim().is_empty() {
            Self::DEFAULT_ROLE.to_string()
        } else {
            role_in_op
        };
        Self { agent_id, role_in_op }
    }

    pub fn field_agent(agent_id: AgentId) -> Self {
        Self::new(agent_id, Self::DEFAULT_ROLE)
    }
}

/// Timestamped log line on an ACTIVE operation. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub user: UserId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Partial update to an operation's briefing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationPatch {
    pub codename: Option<String>,
    pub objective: Option<String>,
    pub success_probability: Option<u8>,
    pub collateral_risk: Option<CollateralRisk>,
}

/// A mission entity.
///
/// Owns its logs and assignments (they vanish with it); requisitions filed
/// against it reference shared assets whose lifetime is the asset's own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    id: OperationId,
    codename: String,
    objective: String,
    status: OperationStatus,
    success_probability: u8,
    collateral_risk: CollateralRisk,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    after_action_report: String,
    assignments: Vec<Assignment>,
    faction_targets: BTreeSet<FactionId>,
    profile_targets: BTreeSet<ProfileId>,
    logs: Vec<LogEntry>,
    archived_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn new(codename: impl Into<String>, objective: impl Into<String>) -> DomainResult<Self> {
        let codename = codename.into();
        if codename.trim().is_empty() {
            return Err(DomainError::validation("codename cannot be empty"));
        }
        let now = Utc::now();
        Ok(Self {
            id: OperationId::new(),
            codename,
            objective: objective.into(),
            status: OperationStatus::Planning,
            success_probability: 50,
            collateral_risk: CollateralRisk::Medium,
            created_at: now,
            updated_at: now,
            started_at: None,
            ended_at: None,
            after_action_report: String::new(),
            assignments: Vec::new(),
            faction_targets: BTreeSet::new(),
            profile_targets: BTreeSet::new(),
            logs: Vec::new(),
            archived_at: None,
        })
    }

    pub fn codename(&self) -> &str {
        &self.codename
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn success_probability(&self) -> u8 {
        self.success_probability
    }

    pub fn collateral_risk(&self) -> CollateralRisk {
        self.collateral_risk
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn after_action_report(&self) -> &str {
        &self.after_action_report
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn faction_targets(&self) -> &BTreeSet<FactionId> {
        &self.faction_targets
    }

    pub fn profile_targets(&self) -> &BTreeSet<ProfileId> {
        &self.profile_targets
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn archived_at(&self) -> Option<DateTime<Utc>> {
        self.archived_at
    }

    /// PLANNING → ACTIVE. Stamps `started_at`.
    pub(crate) fn commence(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.is_planning() {
            return Err(DomainError::invalid_transition(
                "operation is not in the PLANNING stage",
            ));
        }
        self.status = OperationStatus::Active;
        self.started_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// ACTIVE → CONCLUDED_SUCCESS | CONCLUDED_FAILURE. Stores the
    /// after-action report and stamps `ended_at`.
    pub(crate) fn conclude(
        &mut self,
        outcome: Outcome,
        report: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.status.is_active() {
            return Err(DomainError::invalid_transition(
                "only ACTIVE operations can be concluded",
            ));
        }
        self.status = match outcome {
            Outcome::Success => OperationStatus::ConcludedSuccess,
            Outcome::Failure => OperationStatus::ConcludedFailure,
        };
        self.after_action_report = report.into();
        self.ended_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// ACTIVE → COMPROMISED. Appends the abort reason to the report.
    pub(crate) fn abort(&mut self, reason: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.is_active() {
            return Err(DomainError::invalid_transition(
                "only ACTIVE operations can be aborted",
            ));
        }
        if !reason.trim().is_empty() {
            self.after_action_report.push_str(&format!("\nABORTED: {reason}"));
        }
        self.status = OperationStatus::Compromised;
        self.ended_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Replace both target sets. PLANNING only.
    pub(crate) fn set_targets(
        &mut self,
        factions: BTreeSet<FactionId>,
        profiles: BTreeSet<ProfileId>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.status.is_planning() {
            return Err(DomainError::invalid_transition(
                "targets cannot be modified once an operation is active",
            ));
        }
        self.faction_targets = factions;
        self.profile_targets = profiles;
        self.touch(now);
        Ok(())
    }

    /// Replace the personnel roster. PLANNING only; one slot per agent.
    pub(crate) fn set_personnel(
        &mut self,
        assignments: Vec<Assignment>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.status.is_planning() {
            return Err(DomainError::invalid_transition(
                "personnel cannot be modified once an operation is active",
            ));
        }
        let mut seen = BTreeSet::new();
        for assignment in &assignments {
            if !seen.insert(assignment.agent_id) {
                return Err(DomainError::validation(format!(
                    "agent {} assigned more than once",
                    assignment.agent_id
                )));
            }
        }
        self.assignments = assignments;
        self.touch(now);
        Ok(())
    }

    /// Append a log line. ACTIVE only; ordered by timestamp.
    pub(crate) fn append_log(
        &mut self,
        user: UserId,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<LogEntry> {
        if !self.status.is_active() {
            return Err(DomainError::invalid_transition(
                "logs can only be added while operation is ACTIVE",
            ));
        }
        let message = message.into();
        if message.trim().is_empty() {
            return Err(DomainError::validation("message is required"));
        }
        let entry = LogEntry {
            user,
            message,
            timestamp: now,
        };
        self.logs.push(entry.clone());
        Ok(entry)
    }

    /// Apply a briefing patch. The codename is immutable once the operation
    /// has left PLANNING; probability must stay within 0..=100.
    pub(crate) fn apply_patch(&mut self, patch: OperationPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(codename) = &patch.codename {
            if !self.status.is_planning() && codename != &self.codename {
                return Err(DomainError::validation(
                    "codename is immutable once the operation has commenced",
                ));
            }
            if codename.trim().is_empty() {
                return Err(DomainError::validation("codename cannot be empty"));
            }
        }
        if let Some(probability) = patch.success_probability {
            if probability > 100 {
                return Err(DomainError::validation(
                    "success_probability must be between 0 and 100",
                ));
            }
        }

        if let Some(codename) = patch.codename {
            self.codename = codename;
        }
        if let Some(objective) = patch.objective {
            self.objective = objective;
        }
        if let Some(probability) = patch.success_probability {
            self.success_probability = probability;
        }
        if let Some(risk) = patch.collateral_risk {
            self.collateral_risk = risk;
        }
        self.touch(now);
        Ok(())
    }

    pub(crate) fn archive(&mut self, now: DateTime<Utc>) {
        self.archived_at = Some(now);
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

impl Entity for Operation {
    type Id = OperationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op() -> Operation {
        Operation::new("NIGHTFALL", "Disrupt the syndicate's supply line").unwrap()
    }

    #[test]
    fn new_operation_starts_in_planning() {
        let op = op();
        assert_eq!(op.status(), OperationStatus::Planning);
        assert!(op.started_at().is_none());
        assert!(op.ended_at().is_none());
        assert_eq!(op.success_probability(), 50);
        assert_eq!(op.collateral_risk(), CollateralRisk::Medium);
    }

    #[test]
    fn commence_moves_to_active_and_stamps_start() {
        let mut op = op();
        let now = Utc::now();
        op.commence(now).unwrap();
        assert_eq!(op.status(), OperationStatus::Active);
        assert_eq!(op.started_at(), Some(now));
        assert!(op.ended_at().is_none());
    }

    #[test]
    fn commence_twice_is_an_invalid_transition() {
        let mut op = op();
        op.commence(Utc::now()).unwrap();
        let err = op.commence(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        // Second attempt left nothing half-applied.
        assert_eq!(op.status(), OperationStatus::Active);
    }

    #[test]
    fn conclude_requires_active() {
        let mut op = op();
        let err = op.conclude(Outcome::Success, "", Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert!(op.ended_at().is_none());
    }

    #[test]
    fn conclude_stores_report_and_end_time() {
        let mut op = op();
        op.commence(Utc::now()).unwrap();
        let now = Utc::now();
        op.conclude(Outcome::Failure, "extraction blown", now).unwrap();
        assert_eq!(op.status(), OperationStatus::ConcludedFailure);
        assert_eq!(op.after_action_report(), "extraction blown");
        assert_eq!(op.ended_at(), Some(now));
        assert!(op.status().is_terminal());
    }

    #[test]
    fn abort_appends_reason_and_compromises() {
        let mut op = op();
        op.commence(Utc::now()).unwrap();
        op.append_log(UserId::new(), "target spotted", Utc::now()).unwrap();
        op.abort("cover blown", Utc::now()).unwrap();
        assert_eq!(op.status(), OperationStatus::Compromised);
        assert!(op.after_action_report().ends_with("ABORTED: cover blown"));
        assert!(op.ended_at().is_some());
    }

    #[test]
    fn abort_without_reason_leaves_report_untouched() {
        let mut op = op();
        op.commence(Utc::now()).unwrap();
        op.abort("", Utc::now()).unwrap();
        assert_eq!(op.after_action_report(), "");
    }

    #[test]
    fn terminal_states_admit_no_further_transitions() {
        let mut op = op();
        op.commence(Utc::now()).unwrap();
        op.conclude(Outcome::Success, "clean", Utc::now()).unwrap();

        assert!(op.commence(Utc::now()).is_err());
        assert!(op.conclude(Outcome::Failure, "", Utc::now()).is_err());
        assert!(op.abort("x", Utc::now()).is_err());
        assert_eq!(op.status(), OperationStatus::ConcludedSuccess);
    }

    #[test]
    fn targets_are_frozen_once_active() {
        let mut op = op();
        let faction = FactionId::new();
        op.set_targets(BTreeSet::from([faction]), BTreeSet::new(), Utc::now())
            .unwrap();
        op.commence(Utc::now()).unwrap();

        let err = op
            .set_targets(BTreeSet::new(), BTreeSet::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert!(op.faction_targets().contains(&faction));
    }

    #[test]
    fn roster_rejects_duplicate_agents() {
        let mut op = op();
        let agent = AgentId::new();
        let err = op
            .set_personnel(
                vec![Assignment::field_agent(agent), Assignment::new(agent, "Overwatch")],
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(op.assignments().is_empty());
    }

    #[test]
    fn blank_assignment_role_defaults_to_field_agent() {
        let assignment = Assignment::new(AgentId::new(), "  ");
        assert_eq!(assignment.role_in_op, Assignment::DEFAULT_ROLE);
    }

    #[test]
    fn logs_require_active_and_a_message() {
        let mut op = op();
        assert!(op.append_log(UserId::new(), "early", Utc::now()).is_err());

        op.commence(Utc::now()).unwrap();
        assert!(matches!(
            op.append_log(UserId::new(), "   ", Utc::now()),
            Err(DomainError::Validation(_))
        ));

        op.append_log(UserId::new(), "first", Utc::now()).unwrap();
        op.append_log(UserId::new(), "second", Utc::now()).unwrap();
        assert_eq!(op.logs().len(), 2);
        assert!(op.logs()[0].timestamp <= op.logs()[1].timestamp);
    }

    #[test]
    fn codename_is_immutable_once_commenced() {
        let mut op = op();
        op.commence(Utc::now()).unwrap();
        let err = op
            .apply_patch(
                OperationPatch {
                    codename: Some("DAYBREAK".into()),
                    ..OperationPatch::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(op.codename(), "NIGHTFALL");
    }

    #[test]
    fn probability_is_clamped_by_validation() {
        let mut op = op();
        let err = op
            .apply_patch(
                OperationPatch {
                    success_probability: Some(101),
                    ..OperationPatch::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(op.apply_patch(
            OperationPatch {
                success_probability: Some(100),
                ..OperationPatch::default()
            },
            Utc::now(),
        )
        .is_ok());
    }

    #[test]
    fn outcome_parses_strictly() {
        assert_eq!("SUCCESS".parse::<Outcome>().unwrap(), Outcome::Success);
        assert_eq!("FAILURE".parse::<Outcome>().unwrap(), Outcome::Failure);
        assert!(matches!(
            "PARTIAL".parse::<Outcome>(),
            Err(DomainError::Validation(_))
        ));
    }
}
