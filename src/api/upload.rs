use crate::access::{self, Operation, Resource};
use crate::api::documents::find_document;
use crate::auth::models::AuthenticatedUser;
use crate::db::models::{Document, StoredFile};
use crate::db::repositories::Repositories;
use crate::error::AppError;
use crate::forms::validate_upload;
use crate::storage::client::{attachment_key, StorageClient};

/// Attach (or replace) the file of a document.
///
/// Stored under `documents/{department_slug}/{category_name}/{document_id}/{file_name}`.
/// A previous file under a different key is removed afterwards.
pub async fn process_attach_file(
    repos: &Repositories,
    storage: &dyn StorageClient,
    user: &AuthenticatedUser,
    slug: &str,
    file_name: &str,
    content: Vec<u8>,
) -> Result<Document, AppError> {
    let mut document = find_document(repos, slug).await?;
    access::require(user, Operation::Edit, Resource::Document(&document))?;

    let file = validate_upload(file_name, content.len() as u64)?;

    let department_slug = repos
        .departments
        .find_by_id(&document.department_id)
        .await?
        .map(|d| d.slug)
        .unwrap_or_else(|| document.department_id.clone());
    let category_name = repos
        .categories
        .find_by_id(&document.category_id)
        .await?
        .map(|c| c.name)
        .unwrap_or_else(|| document.category_id.clone());

    let key = attachment_key(&department_slug, &category_name, &document.id, &file.file_name);
    storage.put_object(&key, content, &file.content_type).await?;

    let previous = document.file.replace(StoredFile {
        key: key.clone(),
        file_name: file.file_name,
        content_type: file.content_type,
        size: file.size,
    });
    document.updated_at = chrono::Utc::now();
    repos.documents.update(&document).await?;

    if let Some(previous) = previous.filter(|p| p.key != key) {
        if let Err(e) = storage.delete_object(&previous.key).await {
            tracing::warn!(key = %previous.key, error = %e, "failed to delete replaced attachment");
        }
    }

    tracing::info!(slug = %document.slug, key = %key, "attachment stored");
    Ok(document)
}

/// Load the attached file of a document the user may view.
pub async fn process_download_file(
    repos: &Repositories,
    storage: &dyn StorageClient,
    user: &AuthenticatedUser,
    slug: &str,
) -> Result<(StoredFile, Vec<u8>), AppError> {
    let document = find_document(repos, slug).await?;
    access::require(user, Operation::View, Resource::Document(&document))?;

    let file = document
        .file
        .ok_or_else(|| AppError::NotFound(format!("Document '{}' has no file", slug)))?;
    let data = storage
        .get_object(&file.key)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    Ok((file, data))
}

/// Axum handler for `POST /api/v1/documents/{slug}/file`.
///
/// Accepts a multipart form with a single file field named "file".
#[cfg(feature = "server")]
pub async fn attach_file_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Path(slug): axum::extract::Path<String>,
    mut multipart: axum::extract::Multipart,
) -> Result<axum::Json<Document>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.bin").to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;

        let document = process_attach_file(
            &state.repos,
            state.storage.as_ref(),
            &user,
            &slug,
            &file_name,
            data.to_vec(),
        )
        .await?;

        return Ok(axum::Json(document));
    }

    Err(AppError::BadRequest("No file field found in request".into()))
}

/// Axum handler for `GET /api/v1/documents/{slug}/file`.
#[cfg(feature = "server")]
pub async fn download_file_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::extract::Path(slug): axum::extract::Path<String>,
) -> Result<axum::response::Response, AppError> {
    use axum::response::IntoResponse;

    let (file, data) =
        process_download_file(&state.repos, state.storage.as_ref(), &user, &slug).await?;

    let content_type = mime_guess::from_path(&file.file_name)
        .first_or_octet_stream()
        .to_string();
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);

    Ok((
        [
            (axum::http::header::CONTENT_TYPE, content_type),
            (axum::http::header::CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DenyReason;
    use crate::api::documents::process_delete_document;
    use crate::api::documents::tests::Fixture;
    use crate::auth::models::Role;
    use crate::forms::MAX_UPLOAD_BYTES;
    use crate::storage::memory::InMemoryStorage;

    #[tokio::test]
    async fn test_attach_and_download() {
        let fx = Fixture::new().await;
        let manager = fx.user("it-manager", Role::Manager, Some(&fx.it)).await;
        let document = fx.document(&manager, "Test PDF", &fx.guides, true).await;
        let storage = InMemoryStorage::new();

        let updated = process_attach_file(
            &fx.repos,
            &storage,
            &manager,
            &document.slug,
            "test.pdf",
            b"test".to_vec(),
        )
        .await
        .unwrap();
        let file = updated.file.clone().unwrap();
        assert_eq!(file.key, format!("documents/it/Guides/{}/test.pdf", document.id));
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(updated.extension().as_deref(), Some("pdf"));

        let employee = fx.user("it-employee", Role::Employee, Some(&fx.it)).await;
        let (meta, data) = process_download_file(&fx.repos, &storage, &employee, &document.slug)
            .await
            .unwrap();
        assert_eq!(meta.file_name, "test.pdf");
        assert_eq!(data, b"test".to_vec());
    }

    #[tokio::test]
    async fn test_replacing_file_removes_old_blob() {
        let fx = Fixture::new().await;
        let manager = fx.user("it-manager", Role::Manager, Some(&fx.it)).await;
        let document = fx.document(&manager, "Policy", &fx.guides, true).await;
        let storage = InMemoryStorage::new();

        for name in ["v1.docx", "v2.docx"] {
            process_attach_file(&fx.repos, &storage, &manager, &document.slug, name, b"x".to_vec())
                .await
                .unwrap();
        }
        assert_eq!(
            storage.keys(),
            vec![format!("documents/it/Guides/{}/v2.docx", document.id)]
        );
    }

    #[tokio::test]
    async fn test_same_file_name_on_two_documents_stays_separate() {
        let fx = Fixture::new().await;
        let manager = fx.user("it-manager", Role::Manager, Some(&fx.it)).await;
        let first = fx.document(&manager, "Printer Setup", &fx.guides, true).await;
        let second = fx.document(&manager, "Scanner Setup", &fx.guides, true).await;
        let storage = InMemoryStorage::new();

        for (document, bytes) in [(&first, b"printer".to_vec()), (&second, b"scanner".to_vec())] {
            process_attach_file(&fx.repos, &storage, &manager, &document.slug, "manual.pdf", bytes)
                .await
                .unwrap();
        }
        assert_eq!(storage.keys().len(), 2);

        let (_, data) = process_download_file(&fx.repos, &storage, &manager, &first.slug)
            .await
            .unwrap();
        assert_eq!(data, b"printer".to_vec());

        process_delete_document(&fx.repos, &storage, &manager, &second.slug)
            .await
            .unwrap();
        let (_, data) = process_download_file(&fx.repos, &storage, &manager, &first.slug)
            .await
            .unwrap();
        assert_eq!(data, b"printer".to_vec());
    }

    #[tokio::test]
    async fn test_attach_rejects_bad_files() {
        let fx = Fixture::new().await;
        let manager = fx.user("it-manager", Role::Manager, Some(&fx.it)).await;
        let document = fx.document(&manager, "Tools", &fx.guides, true).await;
        let storage = InMemoryStorage::new();

        let exe = process_attach_file(&fx.repos, &storage, &manager, &document.slug, "test.exe", b"MZ".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(exe, AppError::Validation { ref field, .. } if field == "file"));

        let big = vec![0u8; (MAX_UPLOAD_BYTES + 1) as usize];
        let oversized = process_attach_file(&fx.repos, &storage, &manager, &document.slug, "big.zip", big)
            .await
            .unwrap_err();
        assert!(matches!(oversized, AppError::Validation { ref field, .. } if field == "file"));
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn test_attach_requires_edit_permission() {
        let fx = Fixture::new().await;
        let manager = fx.user("it-manager", Role::Manager, Some(&fx.it)).await;
        let document = fx.document(&manager, "Tools", &fx.guides, true).await;
        let employee = fx.user("it-employee", Role::Employee, Some(&fx.it)).await;

        let err = process_attach_file(
            &fx.repos,
            &InMemoryStorage::new(),
            &employee,
            &document.slug,
            "notes.txt",
            b"hi".to_vec(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(DenyReason::NotOwner)));
    }

    #[tokio::test]
    async fn test_download_without_file_is_not_found() {
        let fx = Fixture::new().await;
        let manager = fx.user("it-manager", Role::Manager, Some(&fx.it)).await;
        let document = fx.document(&manager, "Empty", &fx.guides, true).await;
        assert!(matches!(
            process_download_file(&fx.repos, &InMemoryStorage::new(), &manager, &document.slug).await,
            Err(AppError::NotFound(_))
        ));
    }
}
