use serde::{Deserialize, Serialize};

use crate::access::{self, Operation, Resource, ResourceKind};
use crate::auth::models::{AuthenticatedUser, Grants};
use crate::db::models::{Category, Comment, Document, DocumentId, SlugCandidates};
use crate::db::repositories::Repositories;
use crate::error::AppError;
use crate::forms::{DocumentForm, DocumentUpdate};
use crate::storage::client::StorageClient;

/// Upper bound on slug candidates tried for one document.
pub const MAX_SLUG_ATTEMPTS: usize = 100;

/// Query parameters of the document list.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// The document list page.
#[derive(Debug, Serialize)]
pub struct DocumentList {
    /// Newest first.
    pub documents: Vec<Document>,
    pub categories: Vec<Category>,
    pub selected_category: Option<Category>,
    pub can_add_document: bool,
}

/// A comment as shown on the detail page.
#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub can_delete: bool,
}

/// The document detail page.
#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    pub document: Document,
    pub category: Option<Category>,
    /// Active comments, oldest first.
    pub comments: Vec<CommentView>,
    pub can_add_comment: bool,
    pub can_delete_comments: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_manage_documents: bool,
}

/// Result of a document deletion.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: String,
    pub comments_removed: u64,
}

/// Bulk publish/unpublish request.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub ids: Vec<DocumentId>,
    pub published: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdatedCount {
    pub updated: u64,
}

/// Load a document by slug or fail with `NotFound`.
pub(crate) async fn find_document(repos: &Repositories, slug: &str) -> Result<Document, AppError> {
    repos
        .documents
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", slug)))
}

/// List the documents visible to `user`.
///
/// A category filter that is not an identifier, or names a category the
/// user cannot see, is ignored.
pub async fn process_list_documents(
    repos: &Repositories,
    user: &AuthenticatedUser,
    category: Option<&str>,
) -> Result<DocumentList, AppError> {
    let document_scope = access::scope(Some(user), Operation::List, ResourceKind::Document)?;
    let category_scope = access::scope(Some(user), Operation::List, ResourceKind::Category)?;

    let selected_category = match category.filter(|c| !c.is_empty()) {
        None => None,
        Some(raw) => match uuid::Uuid::parse_str(raw) {
            Err(_) => {
                tracing::debug!(filter = raw, "ignoring malformed category filter");
                None
            }
            Ok(id) => repos
                .categories
                .find_by_id(&id.to_string())
                .await?
                .filter(|c| category_scope.admits_category(c)),
        },
    };

    let documents = repos
        .documents
        .list(
            &document_scope,
            selected_category.as_ref().map(|c| c.id.as_str()),
        )
        .await?;
    let categories = repos.categories.list(&category_scope).await?;

    Ok(DocumentList {
        documents,
        categories,
        selected_category,
        can_add_document: access::can(
            Some(user),
            Operation::Create,
            Resource::Kind(ResourceKind::Document),
        )
        .is_permitted(),
    })
}

/// Load a document with its active comments and the caller's capabilities.
pub async fn process_get_document(
    repos: &Repositories,
    user: &AuthenticatedUser,
    slug: &str,
) -> Result<DocumentDetail, AppError> {
    let document = find_document(repos, slug).await?;
    access::require(user, Operation::View, Resource::Document(&document))?;

    let category = repos.categories.find_by_id(&document.category_id).await?;

    let comments = repos
        .comments
        .list_for_document(&document.id, true)
        .await?
        .into_iter()
        .map(|comment| {
            let can_delete = access::can(
                Some(user),
                Operation::Delete,
                Resource::Comment {
                    comment: &comment,
                    document: &document,
                },
            )
            .is_permitted();
            CommentView { comment, can_delete }
        })
        .collect();

    let permitted = |op: Operation| -> bool {
        access::can(Some(user), op, Resource::Document(&document)).is_permitted()
    };
    let can_delete_comments =
        access::scope(Some(user), Operation::ModerateComments, ResourceKind::Comment)
            .map(|scope| scope.admits_department(&document.department_id))
            .unwrap_or(false);

    Ok(DocumentDetail {
        can_add_comment: permitted(Operation::Comment),
        can_edit: permitted(Operation::Edit),
        can_delete: permitted(Operation::Delete),
        can_manage_documents: permitted(Operation::Publish),
        can_delete_comments,
        category,
        comments,
        document,
    })
}

/// Create a document.
///
/// The department defaults to the creator's own. The slug is the first
/// free candidate from [`SlugCandidates`]; uniqueness is enforced by the
/// repository's atomic insert, so concurrent creations never share a slug.
pub async fn process_create_document(
    repos: &Repositories,
    user: &AuthenticatedUser,
    form: DocumentForm,
) -> Result<Document, AppError> {
    access::require(user, Operation::Create, Resource::Kind(ResourceKind::Document))?;
    form.validate()?;

    let category = repos
        .categories
        .find_by_id(&form.category)
        .await?
        .ok_or_else(|| AppError::validation("category", "Category not found"))?;

    let department_id = match form.department.as_deref().filter(|d| !d.is_empty()) {
        Some(id) => {
            repos
                .departments
                .find_by_id(id)
                .await?
                .ok_or_else(|| AppError::validation("department", "Department not found"))?
                .id
        }
        None => user.department.clone().ok_or_else(|| {
            AppError::validation(
                "department",
                "A department is required: choose one or join a department first",
            )
        })?,
    };
    check_category_department(user, &category)?;

    let now = chrono::Utc::now();
    for slug in SlugCandidates::new(&form.title, now.timestamp()).take(MAX_SLUG_ATTEMPTS) {
        let document = Document {
            id: crate::db::models::new_id(),
            title: form.title.trim().to_string(),
            slug,
            content: form.content.clone(),
            author_id: user.user_id.clone(),
            category_id: category.id.clone(),
            department_id: department_id.clone(),
            file: None,
            is_published: true,
            created_at: now,
            updated_at: now,
            last_comment_at: None,
        };

        match repos.documents.insert(document.clone()).await {
            Ok(()) => {
                tracing::info!(
                    slug = %document.slug,
                    author = %user.username,
                    department = %document.department_id,
                    "document created"
                );
                return Ok(document);
            }
            Err(AppError::Conflict(_)) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Conflict(format!(
        "Could not allocate a unique slug for '{}'",
        form.title
    )))
}

/// Without the document grant a user may only file under categories of
/// their own department.
fn check_category_department(user: &AuthenticatedUser, category: &Category) -> Result<(), AppError> {
    if user.is_admin()
        || user.has_grant(Grants::MANAGE_DOCUMENTS)
        || user.in_department(&category.department_id)
    {
        return Ok(());
    }
    Err(AppError::validation(
        "category",
        "Category belongs to another department",
    ))
}

/// Apply a partial update. The slug never changes.
pub async fn process_update_document(
    repos: &Repositories,
    user: &AuthenticatedUser,
    slug: &str,
    update: DocumentUpdate,
) -> Result<Document, AppError> {
    let mut document = find_document(repos, slug).await?;
    access::require(user, Operation::Edit, Resource::Document(&document))?;
    update.validate()?;

    if let Some(category_id) = update.category.as_deref() {
        let category = repos
            .categories
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| AppError::validation("category", "Category not found"))?;
        check_category_department(user, &category)?;
        document.category_id = category.id;
    }
    if let Some(department_id) = update.department.as_deref() {
        let department = repos
            .departments
            .find_by_id(department_id)
            .await?
            .ok_or_else(|| AppError::validation("department", "Department not found"))?;
        document.department_id = department.id;
    }
    if let Some(title) = update.title {
        document.title = title.trim().to_string();
    }
    if let Some(content) = update.content {
        document.content = content;
    }
    document.updated_at = chrono::Utc::now();

    repos.documents.update(&document).await?;
    Ok(document)
}

/// Delete a document and its comments, then its attached file.
///
/// The records go first and atomically; a blob that cannot be removed
/// afterwards is only logged.
pub async fn process_delete_document(
    repos: &Repositories,
    storage: &dyn StorageClient,
    user: &AuthenticatedUser,
    slug: &str,
) -> Result<DeleteResponse, AppError> {
    let document = find_document(repos, slug).await?;
    access::require(user, Operation::Delete, Resource::Document(&document))?;

    let comments_removed = repos.documents.delete_with_comments(&document.id).await?;

    if let Some(file) = &document.file {
        if let Err(e) = storage.delete_object(&file.key).await {
            tracing::warn!(key = %file.key, error = %e, "failed to delete attachment");
        }
    }

    tracing::info!(slug = %document.slug, by = %user.username, comments_removed, "document deleted");

    Ok(DeleteResponse {
        deleted: document.slug,
        comments_removed,
    })
}

/// Bulk publish or unpublish. Ids outside the caller's scope are skipped.
pub async fn process_publish(
    repos: &Repositories,
    user: &AuthenticatedUser,
    request: PublishRequest,
) -> Result<UpdatedCount, AppError> {
    let scope = access::scope(Some(user), Operation::Publish, ResourceKind::Document)?;
    let updated = repos
        .documents
        .set_published(&request.ids, &scope, request.published)
        .await?;
    Ok(UpdatedCount { updated })
}

/// `GET /api/v1/documents`
#[cfg(feature = "server")]
pub async fn list_documents_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Query(query): axum::extract::Query<ListQuery>,
) -> Result<axum::Json<DocumentList>, AppError> {
    let list = process_list_documents(&state.repos, &user, query.category.as_deref()).await?;
    Ok(axum::Json(list))
}

/// `POST /api/v1/documents`
#[cfg(feature = "server")]
pub async fn create_document_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::Json(form): axum::Json<DocumentForm>,
) -> Result<(axum::http::StatusCode, axum::Json<Document>), AppError> {
    let document = process_create_document(&state.repos, &user, form).await?;
    Ok((axum::http::StatusCode::CREATED, axum::Json(document)))
}

/// `GET /api/v1/documents/{slug}`
#[cfg(feature = "server")]
pub async fn get_document_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Path(slug): axum::extract::Path<String>,
) -> Result<axum::Json<DocumentDetail>, AppError> {
    let detail = process_get_document(&state.repos, &user, &slug).await?;
    Ok(axum::Json(detail))
}

/// `PUT /api/v1/documents/{slug}`
#[cfg(feature = "server")]
pub async fn update_document_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Path(slug): axum::extract::Path<String>,
    axum::Json(update): axum::Json<DocumentUpdate>,
) -> Result<axum::Json<Document>, AppError> {
    let document = process_update_document(&state.repos, &user, &slug, update).await?;
    Ok(axum::Json(document))
}

/// `DELETE /api/v1/documents/{slug}`
#[cfg(feature = "server")]
pub async fn delete_document_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Path(slug): axum::extract::Path<String>,
) -> Result<axum::Json<DeleteResponse>, AppError> {
    let response =
        process_delete_document(&state.repos, state.storage.as_ref(), &user, &slug).await?;
    Ok(axum::Json(response))
}

/// `POST /api/v1/admin/documents/publish`
#[cfg(feature = "server")]
pub async fn publish_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::Json(request): axum::Json<PublishRequest>,
) -> Result<axum::Json<UpdatedCount>, AppError> {
    let updated = process_publish(&state.repos, &user, request).await?;
    Ok(axum::Json(updated))
}
