use thiserror::Error;

use crate::access::DenyReason;

/// Guidance shown to authenticated users that have no department yet.
pub const NO_DEPARTMENT_GUIDANCE: &str =
    "Your account is not assigned to a department. Contact an administrator.";

/// Application-wide error types.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(DenyReason),

    /// A softer variant of `Forbidden` for users without a department.
    #[error("{}", NO_DEPARTMENT_GUIDANCE)]
    NeedsDepartment,

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a validation error on a named form field.
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotAuthenticated => AppError::Auth("Not logged in".into()),
            DenyReason::NoDepartment => AppError::NeedsDepartment,
            other => AppError::Forbidden(other),
        }
    }
}

/// Helper conversion from anyhow::Error
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
