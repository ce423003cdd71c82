use async_trait::async_trait;

use crate::access::Scope;
use crate::db::models::{Document, DocumentId};
use crate::error::AppError;

/// Repository trait for document operations.
///
/// This trait allows mocking the database layer in tests.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Insert a new document.
    ///
    /// Fails with [`AppError::Conflict`] when the slug is taken; the check and
    /// the write are a single atomic step.
    async fn insert(&self, doc: Document) -> Result<(), AppError>;

    /// Find a document by its slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Document>, AppError>;

    /// Find a document by its id.
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, AppError>;

    /// List documents admitted by `scope`, optionally within one category.
    /// Newest first.
    async fn list(&self, scope: &Scope, category: Option<&str>) -> Result<Vec<Document>, AppError>;

    /// Replace an existing document (matched by id).
    async fn update(&self, doc: &Document) -> Result<(), AppError>;

    /// Set the publication flag of the given documents that fall in the
    /// scope's department. Returns the number of documents matched.
    async fn set_published(
        &self,
        ids: &[DocumentId],
        scope: &Scope,
        published: bool,
    ) -> Result<u64, AppError>;

    /// Ids of every document of a department.
    async fn ids_in_department(&self, department_id: &str) -> Result<Vec<DocumentId>, AppError>;

    /// Delete a document together with all of its comments, atomically.
    /// Returns the number of comments removed.
    async fn delete_with_comments(&self, id: &str) -> Result<u64, AppError>;
}

/// MongoDB implementation of the DocumentRepository.
///
/// Cascading deletes run in a transaction, so the server must be a replica set.
#[cfg(feature = "server")]
pub struct MongoDocumentRepository {
    client: mongodb::Client,
    collection: mongodb::Collection<Document>,
    comments: mongodb::Collection<crate::db::models::Comment>,
}

#[cfg(feature = "server")]
impl MongoDocumentRepository {
    pub fn new(client: &mongodb::Client, db: &mongodb::Database) -> Self {
        Self {
            client: client.clone(),
            collection: db.collection("documents"),
            comments: db.collection("comments"),
        }
    }

    /// Create the unique slug index backing [`DocumentRepository::insert`].
    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use crate::db::mongo::{db_err, unique_index};

        self.collection
            .create_index(unique_index("slug"))
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(feature = "server")]
#[async_trait]
impl DocumentRepository for MongoDocumentRepository {
    async fn insert(&self, doc: Document) -> Result<(), AppError> {
        use crate::db::mongo::{db_err, is_duplicate_key};

        self.collection.insert_one(&doc).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict(format!("slug '{}' already exists", doc.slug))
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Document>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "slug": slug })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn list(&self, scope: &Scope, category: Option<&str>) -> Result<Vec<Document>, AppError> {
        use crate::db::mongo::{db_err, scope_filter};
        use futures::TryStreamExt;

        let mut filter = scope_filter(scope, "department_id");
        if scope.published_only {
            filter.insert("is_published", true);
        }
        if let Some(category) = category {
            filter.insert("category_id", category);
        }

        let mut cursor = self.collection.find(filter).await.map_err(db_err)?;

        let mut documents = Vec::new();
        while let Some(doc) = cursor.try_next().await.map_err(db_err)? {
            documents.push(doc);
        }

        // Timestamps are stored as RFC 3339 strings; order in memory.
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn update(&self, doc: &Document) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .replace_one(doc! { "_id": &doc.id }, doc)
            .await
            .map_err(crate::db::mongo::db_err)?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Document '{}' not found", doc.slug)));
        }
        Ok(())
    }

    async fn set_published(
        &self,
        ids: &[DocumentId],
        scope: &Scope,
        published: bool,
    ) -> Result<u64, AppError> {
        use crate::db::mongo::{db_err, scope_filter};
        use mongodb::bson::doc;

        let mut filter = scope_filter(scope, "department_id");
        filter.insert("_id", doc! { "$in": ids.to_vec() });

        let now = mongodb::bson::to_bson(&chrono::Utc::now())
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let result = self
            .collection
            .update_many(
                filter,
                doc! { "$set": { "is_published": published, "updated_at": now } },
            )
            .await
            .map_err(db_err)?;

        Ok(result.matched_count)
    }

    async fn ids_in_department(&self, department_id: &str) -> Result<Vec<DocumentId>, AppError> {
        use crate::db::mongo::db_err;
        use futures::TryStreamExt;
        use mongodb::bson::doc;

        let rows: Vec<mongodb::bson::Document> = self
            .collection
            .clone_with_type::<mongodb::bson::Document>()
            .find(doc! { "department_id": department_id })
            .projection(doc! { "_id": 1 })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get_str("_id").ok().map(str::to_string))
            .collect())
    }

    async fn delete_with_comments(&self, id: &str) -> Result<u64, AppError> {
        use crate::db::mongo::db_err;
        use mongodb::bson::doc;

        let mut session = self.client.start_session().await.map_err(db_err)?;
        session.start_transaction().await.map_err(db_err)?;

        let removed = self
            .comments
            .delete_many(doc! { "document_id": id })
            .session(&mut session)
            .await
            .map_err(db_err)?;

        let deleted = self
            .collection
            .delete_one(doc! { "_id": id })
            .session(&mut session)
            .await
            .map_err(db_err)?;

        if deleted.deleted_count == 0 {
            session.abort_transaction().await.map_err(db_err)?;
            return Err(AppError::NotFound(format!("Document '{}' not found", id)));
        }

        session.commit_transaction().await.map_err(db_err)?;
        Ok(removed.deleted_count)
    }
}
