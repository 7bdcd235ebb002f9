//! Role resolution

use serde::{Deserialize, Serialize};

use crate::access::scope::AccessScope;
use crate::models::AccountRole;

/// Effective role of an authenticated account, highest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Superuser,
    Director,
    Teacher,
    Parent,
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superuser => "superuser",
            Role::Director => "director",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::None => "none",
        }
    }

    /// Superuser or director
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Superuser | Role::Director)
    }

    /// Anyone working at the kindergarten
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Superuser | Role::Director | Role::Teacher)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an account to exactly one role.
///
/// Inactive accounts never get a role, whatever they are a member of.
pub fn resolve_role(is_active: bool, is_superuser: bool, memberships: &[AccountRole]) -> Role {
    if !is_active {
        return Role::None;
    }
    if is_superuser {
        return Role::Superuser;
    }
    if memberships.contains(&AccountRole::Director) {
        Role::Director
    } else if memberships.contains(&AccountRole::Teacher) {
        Role::Teacher
    } else if memberships.contains(&AccountRole::Parent) {
        Role::Parent
    } else {
        Role::None
    }
}

/// The authenticated account a request runs as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub account_id: i64,
    pub username: String,
    pub role: Role,
    /// Linked teacher profile, if any
    pub teacher_id: Option<i64>,
    /// Linked parent profile, if any
    pub parent_id: Option<i64>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_superuser(&self) -> bool {
        self.role == Role::Superuser
    }

    /// Rows this principal may read.
    ///
    /// A teacher or parent without a linked profile sees nothing.
    pub fn scope(&self) -> AccessScope {
        match self.role {
            Role::Superuser | Role::Director => AccessScope::All,
            Role::Teacher => self.teacher_id.map_or(AccessScope::Nothing, AccessScope::Teacher),
            Role::Parent => self.parent_id.map_or(AccessScope::Nothing, AccessScope::Parent),
            Role::None => AccessScope::Nothing,
        }
    }
}
