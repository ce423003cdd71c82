//! In-process store implementing every repository trait.
//!
//! All tables sit behind one lock, so the multi-record operations
//! (slug-checked insert, cascading delete) are atomic exactly as the
//! MongoDB implementation makes them. Used by unit tests and by the
//! library without the `server` feature.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::access::Scope;
use crate::db::category_repository::CategoryRepository;
use crate::db::comment_repository::CommentRepository;
use crate::db::department_repository::DepartmentRepository;
use crate::db::document_repository::DocumentRepository;
use crate::db::models::{Category, Comment, Department, Document, DocumentId, User};
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    departments: Vec<Department>,
    users: Vec<User>,
    categories: Vec<Category>,
    documents: Vec<Document>,
    comments: Vec<Comment>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl DepartmentRepository for InMemoryStore {
    async fn insert(&self, department: Department) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        if tables
            .departments
            .iter()
            .any(|d| d.name == department.name || d.slug == department.slug)
        {
            return Err(AppError::Conflict(format!(
                "department '{}' already exists",
                department.name
            )));
        }
        tables.departments.push(department);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Department>, AppError> {
        Ok(self.tables()?.departments.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Department>, AppError> {
        Ok(self
            .tables()?
            .departments
            .iter()
            .find(|d| d.slug == slug)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Department>, AppError> {
        let mut departments = self.tables()?.departments.clone();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: User) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        tables.users.push(user);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self
            .tables()?
            .users
            .iter()
            .filter(|u| scope.admits_user(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn set_department(&self, id: &str, department_id: &str) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", id)))?;
        user.department_id = Some(department_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn insert(&self, category: Category) -> Result<(), AppError> {
        self.tables()?.categories.push(category);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, AppError> {
        Ok(self.tables()?.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<Category>, AppError> {
        let mut categories: Vec<Category> = self
            .tables()?
            .categories
            .iter()
            .filter(|c| scope.admits_category(c))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

#[async_trait]
impl DocumentRepository for InMemoryStore {
    async fn insert(&self, doc: Document) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        if tables.documents.iter().any(|d| d.slug == doc.slug) {
            return Err(AppError::Conflict(format!(
                "slug '{}' already exists",
                doc.slug
            )));
        }
        tables.documents.push(doc);
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Document>, AppError> {
        Ok(self
            .tables()?
            .documents
            .iter()
            .find(|d| d.slug == slug)
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, AppError> {
        Ok(self.tables()?.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list(&self, scope: &Scope, category: Option<&str>) -> Result<Vec<Document>, AppError> {
        let mut documents: Vec<Document> = self
            .tables()?
            .documents
            .iter()
            .filter(|d| scope.admits_document(d))
            .filter(|d| category.is_none_or(|c| d.category_id == c))
            .cloned()
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn update(&self, doc: &Document) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        let slot = tables
            .documents
            .iter_mut()
            .find(|d| d.id == doc.id)
            .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", doc.slug)))?;
        *slot = doc.clone();
        Ok(())
    }

    async fn set_published(
        &self,
        ids: &[DocumentId],
        scope: &Scope,
        published: bool,
    ) -> Result<u64, AppError> {
        let now = chrono::Utc::now();
        let mut matched = 0;
        for doc in self.tables()?.documents.iter_mut() {
            if ids.contains(&doc.id) && scope.admits_department(&doc.department_id) {
                doc.is_published = published;
                doc.updated_at = now;
                matched += 1;
            }
        }
        Ok(matched)
    }

    async fn ids_in_department(&self, department_id: &str) -> Result<Vec<DocumentId>, AppError> {
        Ok(self
            .tables()?
            .documents
            .iter()
            .filter(|d| d.department_id == department_id)
            .map(|d| d.id.clone())
            .collect())
    }

    async fn delete_with_comments(&self, id: &str) -> Result<u64, AppError> {
        let mut tables = self.tables()?;
        let before = tables.documents.len();
        tables.documents.retain(|d| d.id != id);
        if tables.documents.len() == before {
            return Err(AppError::NotFound(format!("Document '{}' not found", id)));
        }

        let comments = tables.comments.len();
        tables.comments.retain(|c| c.document_id != id);
        Ok((comments - tables.comments.len()) as u64)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn insert(&self, comment: Comment) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        let document = tables
            .documents
            .iter_mut()
            .find(|d| d.id == comment.document_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Document '{}' not found", comment.document_id))
            })?;
        document.last_comment_at = Some(comment.created_at);
        tables.comments.push(comment);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>, AppError> {
        Ok(self.tables()?.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_for_document(
        &self,
        document_id: &str,
        active_only: bool,
    ) -> Result<Vec<Comment>, AppError> {
        let mut comments: Vec<Comment> = self
            .tables()?
            .comments
            .iter()
            .filter(|c| c.document_id == document_id && (!active_only || c.is_active))
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn list_for_documents(
        &self,
        document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Comment>, AppError> {
        let mut comments: Vec<Comment> = self
            .tables()?
            .comments
            .iter()
            .filter(|c| document_ids.is_none_or(|ids| ids.contains(&c.document_id)))
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables()?;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        Ok(tables.comments.len() < before)
    }

    async fn set_active(
        &self,
        ids: &[String],
        within: Option<&[DocumentId]>,
        active: bool,
    ) -> Result<u64, AppError> {
        let mut matched = 0;
        for comment in self.tables()?.comments.iter_mut() {
            if ids.contains(&comment.id)
                && within.is_none_or(|docs| docs.contains(&comment.document_id))
            {
                comment.is_active = active;
                matched += 1;
            }
        }
        Ok(matched)
    }
}
