use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, NO_DEPARTMENT_GUIDANCE};

/// Converts AppError into a JSON HTTP response:
/// `{"error": <message>, "kind": <kind>}` plus `reason`, `field` or
/// `guidance` depending on the variant.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "not_authenticated"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NeedsDepartment => (StatusCode::FORBIDDEN, "needs_department"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Database(_) | AppError::Storage(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "kind": kind,
        });
        match &self {
            AppError::Forbidden(reason) => {
                body["reason"] = serde_json::json!(reason);
            }
            AppError::Validation { field, message } => {
                body["field"] = serde_json::json!(field);
                body["error"] = serde_json::json!(message);
            }
            AppError::NeedsDepartment => {
                body["guidance"] = serde_json::json!(NO_DEPARTMENT_GUIDANCE);
            }
            _ => {}
        }

        (status, axum::Json(body)).into_response()
    }
}
