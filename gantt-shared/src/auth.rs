use std::fmt;

use serde::{Deserialize, Serialize};

/// Membership role inside a team.
///
/// Variants are declared from least to most privileged so the derived
/// ordering doubles as the privilege ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Reader,
    Editor,
}

impl Role {
    /// Numeric id persisted in `memberships.role_id`.
    pub fn id(self) -> i32 {
        match self {
            Role::Reader => 1,
            Role::Editor => 2,
        }
    }

    /// Unknown ids degrade to the least privileged role.
    pub fn from_id(id: i32) -> Self {
        match id {
            2 => Role::Editor,
            _ => Role::Reader,
        }
    }

    pub fn has_at_least(self, required: Role) -> bool {
        self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reader => f.write_str("Reader"),
            Role::Editor => f.write_str("Editor"),
        }
    }
}
