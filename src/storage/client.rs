use async_trait::async_trait;

use crate::error::AppError;

/// Trait for blob storage operations (S3-compatible).
///
/// Abstracted as a trait so tests can use a mock without a real S3 instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Store an attachment under `key`, replacing any previous object.
    async fn put_object(&self, key: &str, content: Vec<u8>, content_type: &str) -> Result<(), AppError>;

    /// Retrieve content by key. Returns `None` if the object doesn't exist.
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Remove an object. Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), AppError>;
}

/// Storage key of a document attachment:
/// `documents/{department_slug}/{category_name}/{document_id}/{file_name}`.
///
/// The document id segment keeps equally named files of different
/// documents apart.
pub fn attachment_key(
    department_slug: &str,
    category_name: &str,
    document_id: &str,
    file_name: &str,
) -> String {
    let category = category_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect::<String>();
    format!(
        "documents/{}/{}/{}/{}",
        department_slug, category, document_id, file_name
    )
}

/// S3 implementation of StorageClient.
///
/// Only available when the `server` feature is enabled.
#[cfg(feature = "server")]
pub struct S3StorageClient {
    client: aws_sdk_s3::Client,
    bucket: String,
}

#[cfg(feature = "server")]
impl S3StorageClient {
    /// Create a client from the `s3` configuration section.
    ///
    /// Credentials come from the usual AWS sources (environment, profile).
    /// A custom endpoint (MinIO, LocalStack) switches to path-style addressing.
    pub async fn from_config(config: &crate::config::S3Config) -> Result<Self, AppError> {
        if config.bucket.is_empty() {
            return Err(AppError::Storage("s3.bucket not set".into()));
        }

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let Some(endpoint) = &config.endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;
        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(config.endpoint.is_some())
                .build(),
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
        })
    }

    /// Create with explicit values (useful for testing / DI).
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[cfg(feature = "server")]
#[async_trait]
impl StorageClient for S3StorageClient {
    async fn put_object(&self, key: &str, content: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        let size = content.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(content.into())
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to store attachment '{}': {}", key, e)))?;

        tracing::debug!(key, size, "attachment uploaded");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(|e| AppError::Storage(format!("Failed to read attachment '{}': {}", key, e)))?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    Ok(None)
                } else {
                    Err(AppError::Storage(format!(
                        "Failed to fetch attachment '{}': {}",
                        key, service_err
                    )))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!("Failed to delete attachment '{}': {}", key, e))
            })?;

        Ok(())
    }
}
