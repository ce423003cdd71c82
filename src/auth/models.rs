use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::{DepartmentId, UserId};

/// Organizational role of a user. Fixed per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Department-independent, permitted everything.
    Admin,
    /// Manages documents and comments of their own department.
    Manager,
    /// Regular department member.
    #[default]
    Employee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Employee => write!(f, "employee"),
        }
    }
}

bitflags! {
    /// Explicit grants held by a user on top of their role.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Grants: u32 {
        /// Create departments.
        const MANAGE_DEPARTMENTS = 1 << 0;
        /// Create categories in any department.
        const MANAGE_CATEGORIES  = 1 << 1;
        /// Create, edit, delete and publish any document.
        const MANAGE_DOCUMENTS   = 1 << 2;
    }
}

/// The authenticated user an access decision is made for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    /// `None` while the user is not assigned to a department.
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub grants: Grants,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_grant(&self, grant: Grants) -> bool {
        self.grants.contains(grant)
    }

    /// Returns `true` if the user belongs to the given department.
    pub fn in_department(&self, department: &str) -> bool {
        self.department.as_deref() == Some(department)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let role: Role = serde_json::from_str("\"EMPLOYEE\"").unwrap();
        assert_eq!(role, Role::Employee);
    }

    #[test]
    fn test_in_department() {
        let user = AuthenticatedUser {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            role: Role::Employee,
            department: Some("it".to_string()),
            grants: Grants::empty(),
        };
        assert!(user.in_department("it"));
        assert!(!user.in_department("hr"));

        let unassigned = AuthenticatedUser {
            department: None,
            ..user
        };
        assert!(!unassigned.in_department("it"));
    }

    #[test]
    fn test_grants_roundtrip() {
        let user = AuthenticatedUser {
            user_id: "u2".to_string(),
            username: "editor".to_string(),
            role: Role::Employee,
            department: None,
            grants: Grants::MANAGE_DOCUMENTS | Grants::MANAGE_CATEGORIES,
        };
        let json = serde_json::to_string(&user).unwrap();
        let back: AuthenticatedUser = serde_json::from_str(&json).unwrap();
        assert!(back.has_grant(Grants::MANAGE_DOCUMENTS));
        assert!(!back.has_grant(Grants::MANAGE_DEPARTMENTS));
    }
}
