use serde::{Deserialize, Serialize};

use crate::access::{self, Operation, Resource, ResourceKind};
use crate::api::documents::{find_document, UpdatedCount};
use crate::auth::models::AuthenticatedUser;
use crate::db::models::{new_id, Comment, CommentId};
use crate::db::repositories::Repositories;
use crate::error::AppError;
use crate::forms::CommentForm;

/// Bulk activate/deactivate request.
#[derive(Debug, Deserialize)]
pub struct ModerateRequest {
    pub ids: Vec<CommentId>,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentDeleted {
    pub deleted: CommentId,
}

/// Add a comment to the document with the given slug.
///
/// Access is checked before the form.
pub async fn process_add_comment(
    repos: &Repositories,
    user: &AuthenticatedUser,
    slug: &str,
    form: CommentForm,
) -> Result<Comment, AppError> {
    let document = find_document(repos, slug).await?;
    access::require(user, Operation::Comment, Resource::Document(&document))?;

    let clean = form.clean()?;
    let comment = Comment {
        id: new_id(),
        document_id: document.id,
        author_id: user.user_id.clone(),
        text: clean.text,
        link: clean.link,
        created_at: chrono::Utc::now(),
        is_active: true,
    };

    repos.comments.insert(comment.clone()).await?;
    Ok(comment)
}

/// Hard-delete a single comment.
pub async fn process_delete_comment(
    repos: &Repositories,
    user: &AuthenticatedUser,
    comment_id: &str,
) -> Result<CommentDeleted, AppError> {
    let comment = repos
        .comments
        .find_by_id(comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment '{}' not found", comment_id)))?;
    let document = repos
        .documents
        .find_by_id(&comment.document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", comment.document_id)))?;

    access::require(
        user,
        Operation::Delete,
        Resource::Comment {
            comment: &comment,
            document: &document,
        },
    )?;

    if !repos.comments.delete(&comment.id).await? {
        return Err(AppError::NotFound(format!("Comment '{}' not found", comment_id)));
    }

    tracing::info!(comment = %comment.id, document = %document.slug, by = %user.username, "comment deleted");
    Ok(CommentDeleted { deleted: comment.id })
}

/// Document ids a moderation scope is limited to; `None` means all.
async fn moderation_documents(
    repos: &Repositories,
    user: &AuthenticatedUser,
) -> Result<Option<Vec<String>>, AppError> {
    let scope = access::scope(Some(user), Operation::ModerateComments, ResourceKind::Comment)?;
    match scope.department {
        None => Ok(None),
        Some(department) => Ok(Some(repos.documents.ids_in_department(&department).await?)),
    }
}

/// Comments the caller may moderate, active and inactive, newest first.
pub async fn process_list_moderation(
    repos: &Repositories,
    user: &AuthenticatedUser,
) -> Result<Vec<Comment>, AppError> {
    let within = moderation_documents(repos, user).await?;
    repos.comments.list_for_documents(within.as_deref()).await
}

/// Bulk activate or deactivate comments. Ids outside the caller's scope are
/// skipped.
pub async fn process_moderate(
    repos: &Repositories,
    user: &AuthenticatedUser,
    request: ModerateRequest,
) -> Result<UpdatedCount, AppError> {
    let within = moderation_documents(repos, user).await?;
    let updated = repos
        .comments
        .set_active(&request.ids, within.as_deref(), request.active)
        .await?;
    Ok(UpdatedCount { updated })
}

/// `POST /api/v1/documents/{slug}/comments`
#[cfg(feature = "server")]
pub async fn add_comment_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Path(slug): axum::extract::Path<String>,
    axum::Json(form): axum::Json<CommentForm>,
) -> Result<(axum::http::StatusCode, axum::Json<Comment>), AppError> {
    let comment = process_add_comment(&state.repos, &user, &slug, form).await?;
    Ok((axum::http::StatusCode::CREATED, axum::Json(comment)))
}

/// `DELETE /api/v1/comments/{id}`
#[cfg(feature = "server")]
pub async fn delete_comment_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Path(id): axum::extract::Path<String>,
) -> Result<axum::Json<CommentDeleted>, AppError> {
    let deleted = process_delete_comment(&state.repos, &user, &id).await?;
    Ok(axum::Json(deleted))
}

/// `GET /api/v1/admin/comments`
#[cfg(feature = "server")]
pub async fn list_moderation_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
) -> Result<axum::Json<Vec<Comment>>, AppError> {
    let comments = process_list_moderation(&state.repos, &user).await?;
    Ok(axum::Json(comments))
}

/// `POST /api/v1/admin/comments/moderate`
#[cfg(feature = "server")]
pub async fn moderate_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::Json(request): axum::Json<ModerateRequest>,
) -> Result<axum::Json<UpdatedCount>, AppError> {
    let updated = process_moderate(&state.repos, &user, request).await?;
    Ok(axum::Json(updated))
}
