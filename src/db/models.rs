use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::models::{AuthenticatedUser, Grants, Role};

pub type DepartmentId = String;
pub type UserId = String;
pub type CategoryId = String;
pub type DocumentId = String;
pub type CommentId = String;

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Maximum slug length (matches the document title limit).
pub const MAX_SLUG_LENGTH: usize = 200;

/// Base slug used when a title contains nothing sluggable.
pub const FALLBACK_SLUG: &str = "document";

/// Generate a URL-friendly slug: lower-case ASCII alphanumerics joined by `-`.
pub fn slugify(text: &str) -> String {
    let slug = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.len() <= MAX_SLUG_LENGTH {
        slug
    } else {
        slug.chars()
            .take(MAX_SLUG_LENGTH)
            .collect::<String>()
            .trim_end_matches('-')
            .to_string()
    }
}

/// Slug candidates for a new document: the bare base first, then
/// `base-<n>` with `n` starting at the given timestamp and advancing by one.
/// The base is shortened as needed so no candidate exceeds [`MAX_SLUG_LENGTH`].
#[derive(Debug, Clone)]
pub struct SlugCandidates {
    base: String,
    next: Option<i64>,
    first: bool,
}

impl SlugCandidates {
    pub fn new(title: &str, timestamp: i64) -> Self {
        let base = slugify(title);
        Self {
            base: if base.is_empty() {
                FALLBACK_SLUG.to_string()
            } else {
                base
            },
            next: Some(timestamp),
            first: true,
        }
    }
}

impl Iterator for SlugCandidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.first {
            self.first = false;
            return Some(self.base.clone());
        }
        let n = self.next?;
        self.next = n.checked_add(1);
        let suffix = format!("-{}", n);
        // Slugs are ASCII, so byte and char lengths agree.
        let keep = MAX_SLUG_LENGTH.saturating_sub(suffix.len()).min(self.base.len());
        Some(format!("{}{}", self.base[..keep].trim_end_matches('-'), suffix))
    }
}

/// Organizational partition scoping visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "_id")]
    pub id: DepartmentId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

impl Department {
    /// Build a department; the slug is derived from the name when absent.
    pub fn new(name: &str, slug: Option<&str>, description: &str) -> Self {
        let slug = slug
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| slugify(name));
        Self {
            id: new_id(),
            name: name.to_string(),
            slug,
            description: description.to_string(),
        }
    }
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub grants: Grants,
}

impl User {
    pub fn new(username: &str, role: Role, department_id: Option<DepartmentId>) -> Self {
        Self {
            id: new_id(),
            username: username.to_string(),
            email: String::new(),
            role,
            department_id,
            position: String::new(),
            grants: Grants::empty(),
        }
    }

    /// The principal used for access decisions.
    pub fn principal(&self) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: self.id.clone(),
            username: self.username.clone(),
            role: self.role,
            department: self.department_id.clone(),
            grants: self.grants,
        }
    }
}

/// A document category; belongs to exactly one department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    pub department_id: DepartmentId,
    #[serde(default)]
    pub description: String,
}

impl Category {
    pub fn new(name: &str, department_id: &str, description: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            department_id: department_id.to_string(),
            description: description.to_string(),
        }
    }
}

/// Metadata of a file attached to a document; the bytes live in blob storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Storage key of the blob.
    pub key: String,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

/// A knowledge-base document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    /// Unique and immutable once assigned.
    pub slug: String,
    pub content: String,
    pub author_id: UserId,
    pub category_id: CategoryId,
    /// Access rules key off this field, not the category's department.
    pub department_id: DepartmentId,
    #[serde(default)]
    pub file: Option<StoredFile>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Touched by every comment insert so it conflicts with a concurrent delete.
    #[serde(default)]
    pub last_comment_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Lower-cased extension of the attached file, if any.
    pub fn extension(&self) -> Option<String> {
        let file = self.file.as_ref()?;
        let (_, ext) = file.file_name.rsplit_once('.')?;
        Some(ext.to_lowercase())
    }
}

/// A comment on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: CommentId,
    pub document_id: DocumentId,
    pub author_id: UserId,
    pub text: String,
    #[serde(default)]
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Installation Guide"), "installation-guide");
        assert_eq!(slugify("  Q3 -- Report!! "), "q3-report");
        assert_eq!(slugify("Test Department"), "test-department");
        assert_eq!(slugify("Отдел"), "");
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "a".repeat(250);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LENGTH);
    }

    #[test]
    fn test_slug_candidates_advance() {
        let candidates: Vec<String> = SlugCandidates::new("Installation Guide", 1_700_000_000)
            .take(3)
            .collect();
        assert_eq!(
            candidates,
            vec![
                "installation-guide".to_string(),
                "installation-guide-1700000000".to_string(),
                "installation-guide-1700000001".to_string(),
            ]
        );
    }

    #[test]
    fn test_slug_candidates_respect_max_length() {
        let title = format!("{} {}", "a".repeat(195), "b".repeat(60));
        let candidates: Vec<String> = SlugCandidates::new(&title, 1_700_000_000)
            .take(3)
            .collect();
        assert_eq!(candidates[0].len(), MAX_SLUG_LENGTH);
        for slug in &candidates[1..] {
            assert!(slug.len() <= MAX_SLUG_LENGTH, "{} chars", slug.len());
            assert!(!slug.contains("--"));
        }
        assert!(candidates[1].ends_with("-1700000000"));
        assert!(candidates[2].ends_with("-1700000001"));
        assert_ne!(candidates[1], candidates[2]);
    }

    #[test]
    fn test_slug_candidates_fallback() {
        let mut candidates = SlugCandidates::new("Руководство", 5);
        assert_eq!(candidates.next().as_deref(), Some(FALLBACK_SLUG));
        assert_eq!(candidates.next().as_deref(), Some("document-5"));
    }

    #[test]
    fn test_department_slug_generated_once() {
        let dept = Department::new("Another Department", None, "");
        assert_eq!(dept.slug, "another-department");

        let explicit = Department::new("Information Technology", Some("it"), "");
        assert_eq!(explicit.slug, "it");
    }

    #[test]
    fn test_document_extension() {
        let now = Utc::now();
        let mut doc = Document {
            id: new_id(),
            title: "Test PDF".to_string(),
            slug: "test-pdf".to_string(),
            content: "Content".to_string(),
            author_id: "u".to_string(),
            category_id: "c".to_string(),
            department_id: "d".to_string(),
            file: None,
            is_published: true,
            created_at: now,
            updated_at: now,
            last_comment_at: None,
        };
        assert_eq!(doc.extension(), None);

        doc.file = Some(StoredFile {
            key: "documents/it/Guides/Test.PDF".to_string(),
            file_name: "Test.PDF".to_string(),
            content_type: "application/pdf".to_string(),
            size: 12,
        });
        assert_eq!(doc.extension().as_deref(), Some("pdf"));
    }

    #[test]
    fn test_comment_defaults_active() {
        let json = r###"{
            "_id": "c1",
            "document_id": "d1",
            "author_id": "u1",
            "text": "Great campaign!",
            "created_at": "2024-01-01T00:00:00Z"
        }"###;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert!(comment.is_active);
        assert_eq!(comment.link, None);
    }
}
