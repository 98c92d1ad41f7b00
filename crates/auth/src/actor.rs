use serde::{Deserialize, Serialize};

use tradecraft_core::UserId;

use crate::Role;

/// A fully resolved authenticated principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the surrounding
/// application derives the role from its own session/claims machinery.
/// Every actor has exactly one role at a time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user: UserId, role: Role) -> Self {
        Self { user, role }
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.user, self.role)
    }
}
