//! Declarative (role, action) policy table + state-dependent predicate hooks.
//!
//! The table answers "may this role ever perform this action"; hooks answer
//! the per-request questions that depend on current entity state. Services
//! consult the table first and the relevant hook second, always before any
//! write.

use serde::Serialize;

use tradecraft_core::{DomainError, DomainResult};

use crate::{Action, Actor, Role};

/// Outcome of a permission check.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Static policy lookup.
///
/// - No IO
/// - No panics
/// - Pure function of (role, action)
pub fn evaluate(role: Role, action: Action) -> Decision {
    use Action::*;
    use Role::*;

    let allowed = match action {
        // Any authenticated role may read.
        Read => true,
        Create | Update | ReconcileMembership => matches!(role, Hq | Protector | Heir),
        Purge => matches!(role, Hq | Protector),
        Archive => matches!(role, Hq | Protector | Heir),
        CommenceOperation | DecideRequisition => role == Protector,
        ConcludeOperation | AbortOperation | AppendOperationLog | RequestAsset => {
            matches!(role, Protector | Heir)
        }
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

/// Table lookup raised to a domain error at the service boundary.
pub fn require(actor: &Actor, action: Action) -> DomainResult<()> {
    match evaluate(actor.role, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(DomainError::forbidden(format!(
            "role {} may not {}",
            actor.role, action
        ))),
    }
}

/// Content-based hook: HEIR may edit an operation only while it is still in
/// the PLANNING stage. Evaluated per-request against current state, never
/// precomputed.
pub fn planning_stage_rule(role: Role, in_planning: bool) -> Decision {
    if role == Role::Heir && !in_planning {
        Decision::Deny
    } else {
        Decision::Allow
    }
}

/// [`planning_stage_rule`] raised to a domain error.
pub fn require_planning_stage(actor: &Actor, in_planning: bool) -> DomainResult<()> {
    match planning_stage_rule(actor.role, in_planning) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(DomainError::forbidden(
            "heirs can only edit operations in the PLANNING stage",
        )),
    }
}

/// What a role-resolved delete actually did to the record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteDisposition {
    Archived,
    Purged,
}

/// Resolve the generic "delete" intent to the concrete action a role gets.
///
/// HQ and PROTECTOR hard-delete; HEIR archives instead; everyone else gets
/// nothing (the caller audits the denial).
pub fn resolve_delete(role: Role) -> Option<Action> {
    match role {
        Role::Hq | Role::Protector => Some(Action::Purge),
        Role::Heir => Some(Action::Archive),
        Role::Observer => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn read_is_open_to_every_role() {
        for role in Role::ALL {
            assert_eq!(evaluate(role, Action::Read), Decision::Allow);
        }
    }

    #[test]
    fn observer_is_denied_every_mutation() {
        for action in Action::ALL {
            if action == Action::Read {
                continue;
            }
            assert_eq!(evaluate(Role::Observer, action), Decision::Deny, "{action}");
        }
    }

    #[test]
    fn only_protector_commences_and_decides_requisitions() {
        for role in Role::ALL {
            let expected = if role == Role::Protector { Decision::Allow } else { Decision::Deny };
            assert_eq!(evaluate(role, Action::CommenceOperation), expected);
            assert_eq!(evaluate(role, Action::DecideRequisition), expected);
        }
    }

    #[test]
    fn heir_archives_where_seniors_purge() {
        assert_eq!(resolve_delete(Role::Hq), Some(Action::Purge));
        assert_eq!(resolve_delete(Role::Protector), Some(Action::Purge));
        assert_eq!(resolve_delete(Role::Heir), Some(Action::Archive));
        assert_eq!(resolve_delete(Role::Observer), None);
        assert_eq!(evaluate(Role::Heir, Action::Purge), Decision::Deny);
        assert_eq!(evaluate(Role::Heir, Action::Archive), Decision::Allow);
    }

    #[test]
    fn planning_rule_only_constrains_heir() {
        assert_eq!(planning_stage_rule(Role::Heir, false), Decision::Deny);
        assert_eq!(planning_stage_rule(Role::Heir, true), Decision::Allow);
        assert_eq!(planning_stage_rule(Role::Protector, false), Decision::Allow);
        assert_eq!(planning_stage_rule(Role::Hq, false), Decision::Allow);
    }

    proptest! {
        /// Property: `evaluate` is a pure function — the same (role, action)
        /// pair always yields the same decision.
        #[test]
        fn evaluate_is_deterministic(
            role in proptest::sample::select(Role::ALL.to_vec()),
            action in proptest::sample::select(Action::ALL.to_vec()),
        ) {
            prop_assert_eq!(evaluate(role, action), evaluate(role, action));
        }

        /// Property: privilege is monotone for the coarse CRUD verbs — if a
        /// role may perform one of them, every higher-ranked role may too.
        #[test]
        fn crud_privilege_is_monotone(
            action in proptest::sample::select(vec![
                Action::Read, Action::Create, Action::Update, Action::Archive, Action::Purge,
            ]),
        ) {
            for window in Role::ALL.windows(2) {
                let (lower, higher) = (window[0], window[1]);
                if evaluate(lower, action).is_allowed() {
                    prop_assert!(evaluate(higher, action).is_allowed(),
                        "{} allowed but {} denied for {}", lower, higher, action);
                }
            }
        }
    }
}
