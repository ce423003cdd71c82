//! Visibility and authorization decisions.
//!
//! Every decision about who may see, create, modify or delete a department,
//! category, document or comment is made here, from the authenticated user
//! and the target resource alone. Nothing in this module performs I/O.
//!
//! Callers authenticate first, then ask [`can`] (single resource) or
//! [`scope`] (list queries).

mod resolver;
mod scope;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::models::{Category, Comment, Department, Document, User};
use crate::error::AppError;

pub use resolver::{can, require, scope};
pub use scope::Scope;

/// The operation being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    View,
    List,
    Create,
    Edit,
    Delete,
    /// Create a comment on a document.
    Comment,
    /// Bulk activate/deactivate comments.
    ModerateComments,
    /// Bulk publish/unpublish documents.
    Publish,
    /// Choose the department of a user.
    AssignDepartment,
}

/// Resource types, for list-level and create-level checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Department,
    Category,
    Document,
    Comment,
    User,
}

/// The target of an operation.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// No instance: list-level or create-level check.
    Kind(ResourceKind),
    Department(&'a Department),
    Category(&'a Category),
    Document(&'a Document),
    /// A comment together with the document it belongs to.
    Comment {
        comment: &'a Comment,
        document: &'a Document,
    },
    User(&'a User),
}

impl Resource<'_> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Kind(kind) => *kind,
            Resource::Department(_) => ResourceKind::Department,
            Resource::Category(_) => ResourceKind::Category,
            Resource::Document(_) => ResourceKind::Document,
            Resource::Comment { .. } => ResourceKind::Comment,
            Resource::User(_) => ResourceKind::User,
        }
    }
}

/// Why an operation was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DenyReason {
    NotAuthenticated,
    /// The user has no department; surfaced as guidance, not a bare 403.
    NoDepartment,
    WrongDepartment,
    Unpublished,
    NotOwner,
    InsufficientRole,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NotAuthenticated => write!(f, "not authenticated"),
            DenyReason::NoDepartment => write!(f, "no department assigned"),
            DenyReason::WrongDepartment => write!(f, "resource belongs to another department"),
            DenyReason::Unpublished => write!(f, "document is not published"),
            DenyReason::NotOwner => write!(f, "only the author may do this"),
            DenyReason::InsufficientRole => write!(f, "role does not allow this operation"),
        }
    }
}

/// Outcome of an access check. Always one or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_permitted(&self) -> bool {
        matches!(self, Decision::Permit)
    }

    /// Convert into a result, mapping the deny reason onto [`AppError`].
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Permit => Ok(()),
            Decision::Deny(reason) => Err(reason.into()),
        }
    }
}
