use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tradecraft_core::DomainError;

/// Privilege tier assigned to an actor.
///
/// The hierarchy is fixed and totally ordered: `HQ > PROTECTOR > HEIR >
/// OBSERVER`. Variants are declared in ascending privilege so the derived
/// `Ord` matches the domain ordering.
///
/// `OBSERVER` is the canonical name for the legacy "OVERLOOKER" tier; the two
/// were synonymous and carry identical (lowest) privileges.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Observer,
    Heir,
    Protector,
    Hq,
}

impl Role {
    /// Every role, ascending privilege.
    pub const ALL: [Role; 4] = [Role::Observer, Role::Heir, Role::Protector, Role::Hq];

    /// Roles notified on operation status changes.
    pub const COMMAND_TIER: [Role; 2] = [Role::Protector, Role::Heir];

    /// Numeric rank within the hierarchy (higher = more privileged).
    pub fn rank(self) -> u8 {
        match self {
            Role::Observer => 0,
            Role::Heir => 1,
            Role::Protector => 2,
            Role::Hq => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Observer => "OBSERVER",
            Role::Heir => "HEIR",
            Role::Protector => "PROTECTOR",
            Role::Hq => "HQ",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HQ" => Ok(Role::Hq),
            "PROTECTOR" => Ok(Role::Protector),
            "HEIR" => Ok(Role::Heir),
            // OVERLOOKER is the pre-rename spelling still present in old data.
            "OBSERVER" | "OVERLOOKER" => Ok(Role::Observer),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_totally_ordered() {
        assert!(Role::Hq > Role::Protector);
        assert!(Role::Protector > Role::Heir);
        assert!(Role::Heir > Role::Observer);
        assert_eq!(Role::Hq.rank(), 3);
        assert_eq!(Role::Observer.rank(), 0);
    }

    #[test]
    fn legacy_overlooker_parses_as_observer() {
        assert_eq!("OVERLOOKER".parse::<Role>().unwrap(), Role::Observer);
        assert_eq!("OBSERVER".parse::<Role>().unwrap(), Role::Observer);
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!("WARDEN".parse::<Role>().is_err());
    }
}
