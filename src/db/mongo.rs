//! Shared MongoDB helpers for the repository implementations.

use bson::{doc, Document as BsonDocument};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

use crate::access::Scope;
use crate::error::AppError;

const DUPLICATE_KEY: i32 = 11000;

pub(crate) fn db_err(e: mongodb::error::Error) -> AppError {
    AppError::Database(e.to_string())
}

/// Whether the error is a unique index violation.
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: DUPLICATE_KEY, .. }))
    )
}

pub(crate) fn unique_index(field: &str) -> IndexModel {
    IndexModel::builder()
        .keys(doc! { field: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// Base filter for a scope: restricts `department_field` when scoped.
pub(crate) fn scope_filter(scope: &Scope, department_field: &str) -> BsonDocument {
    let mut filter = BsonDocument::new();
    if let Some(department) = &scope.department {
        filter.insert(department_field, department.as_str());
    }
    filter
}
