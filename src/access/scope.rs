use serde::{Deserialize, Serialize};

use crate::db::models::{Category, DepartmentId, Document, User};

/// Filter predicate narrowing a list query to the caller's permitted subset.
///
/// Repositories translate it into their own query language; the `admits_*`
/// methods are the reference semantics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    /// Restrict to this department. `None` means every department.
    pub department: Option<DepartmentId>,
    /// Only published documents. Ignored for other resource types.
    pub published_only: bool,
}

impl Scope {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn department(department: DepartmentId) -> Self {
        Self {
            department: Some(department),
            published_only: false,
        }
    }

    pub fn published_only(mut self) -> Self {
        self.published_only = true;
        self
    }

    /// Whether a resource of the given department falls in scope.
    pub fn admits_department(&self, department_id: &str) -> bool {
        self.department
            .as_deref()
            .is_none_or(|scoped| scoped == department_id)
    }

    pub fn admits_document(&self, document: &Document) -> bool {
        self.admits_department(&document.department_id)
            && (!self.published_only || document.is_published)
    }

    pub fn admits_category(&self, category: &Category) -> bool {
        self.admits_department(&category.department_id)
    }

    pub fn admits_user(&self, user: &User) -> bool {
        match &self.department {
            None => true,
            Some(scoped) => user.department_id.as_deref() == Some(scoped.as_str()),
        }
    }
}
