//! Input validation for documents, comments and file uploads.
//!
//! Every rejection is an [`AppError::Validation`] naming the offending field.

use serde::{Deserialize, Serialize};

use crate::db::models::{CategoryId, DepartmentId};
use crate::error::AppError;

/// Maximum document title length.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum comment link length.
pub const MAX_LINK_LENGTH: usize = 500;

/// Maximum size of an uploaded file (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted extensions: documents, images and archives.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "csv", "txt", "rtf", "odt", "ppt", "pptx",
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "svg",
    "zip", "rar", "7z",
];

/// An uploaded file that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    /// Sanitized file name, safe to use in a storage key.
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

/// Validate an uploaded file by extension and size.
///
/// The content type is guessed from the extension.
pub fn validate_upload(file_name: &str, size: u64) -> Result<ValidatedFile, AppError> {
    let (_, ext) = file_name
        .rsplit_once('.')
        .ok_or_else(|| AppError::validation("file", "File type not allowed"))?;
    let ext = ext.to_lowercase();

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::validation("file", format!("File type '.{ext}' not allowed")));
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(AppError::validation(
            "file",
            "File too large (maximum 10 MiB)",
        ));
    }

    let content_type = mime_guess::from_ext(&ext).first_or_octet_stream();

    Ok(ValidatedFile {
        file_name: sanitize_file_name(file_name),
        content_type: content_type.essence_str().to_string(),
        size,
    })
}

fn sanitize_file_name(file_name: &str) -> String {
    // Browsers may send a full client path.
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);
    base.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Payload for creating a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentForm {
    pub title: String,
    pub content: String,
    pub category: CategoryId,
    /// Defaults to the creator's department when absent.
    #[serde(default)]
    pub department: Option<DepartmentId>,
}

impl DocumentForm {
    /// Field-level checks that need no lookups.
    pub fn validate(&self) -> Result<(), AppError> {
        validate_title(&self.title)?;
        if self.content.trim().is_empty() {
            return Err(AppError::validation("content", "Content is required"));
        }
        if self.category.trim().is_empty() {
            return Err(AppError::validation("category", "A category is required"));
        }
        Ok(())
    }
}

/// Partial update of a document. The slug never changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub department: Option<DepartmentId>,
}

impl DocumentUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if matches!(&self.content, Some(content) if content.trim().is_empty()) {
            return Err(AppError::validation("content", "Content is required"));
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::validation("title", "Title is required"));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::validation(
            "title",
            format!("Title must be at most {MAX_TITLE_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Payload for adding a comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub link: Option<String>,
}

/// A comment that passed validation: trimmed text and an optional link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanComment {
    pub text: String,
    pub link: Option<String>,
}

impl CommentForm {
    pub fn clean(&self) -> Result<CleanComment, AppError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(AppError::validation("text", "Comment text cannot be empty"));
        }

        let link = match self.link.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(link) => Some(clean_link(link)?),
        };

        Ok(CleanComment {
            text: text.to_string(),
            link,
        })
    }
}

fn clean_link(link: &str) -> Result<String, AppError> {
    if !(link.starts_with("http://") || link.starts_with("https://")) {
        return Err(AppError::validation(
            "link",
            "Link must start with http:// or https://",
        ));
    }
    if link.len() > MAX_LINK_LENGTH {
        return Err(AppError::validation(
            "link",
            format!("Link must be at most {MAX_LINK_LENGTH} characters"),
        ));
    }
    url::Url::parse(link).map_err(|e| AppError::validation("link", format!("Invalid URL: {e}")))?;
    Ok(link.to_string())
}
