use async_trait::async_trait;

use crate::db::models::{Comment, DocumentId};
use crate::error::AppError;

/// Repository trait for comment operations.
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn insert(&self, comment: Comment) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>, AppError>;

    /// Comments of one document, oldest first.
    async fn list_for_document(
        &self,
        document_id: &str,
        active_only: bool,
    ) -> Result<Vec<Comment>, AppError>;

    /// Comments on any of `document_ids`, or on every document when `None`.
    /// Newest first, active and inactive alike.
    async fn list_for_documents(
        &self,
        document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Comment>, AppError>;

    /// Delete a single comment. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, AppError>;

    /// Set the active flag of the given comments, restricted to comments on
    /// `within` when given. Returns the number of comments matched.
    async fn set_active(
        &self,
        ids: &[String],
        within: Option<&[DocumentId]>,
        active: bool,
    ) -> Result<u64, AppError>;
}

/// MongoDB implementation of the CommentRepository.
#[cfg(feature = "server")]
pub struct MongoCommentRepository {
    client: mongodb::Client,
    collection: mongodb::Collection<Comment>,
    documents: mongodb::Collection<crate::db::models::Document>,
}

#[cfg(feature = "server")]
impl MongoCommentRepository {
    pub fn new(client: &mongodb::Client, db: &mongodb::Database) -> Self {
        Self {
            client: client.clone(),
            collection: db.collection("comments"),
            documents: db.collection("documents"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use mongodb::bson::doc;
        use mongodb::IndexModel;

        self.collection
            .create_index(IndexModel::builder().keys(doc! { "document_id": 1 }).build())
            .await
            .map_err(crate::db::mongo::db_err)?;
        Ok(())
    }

    async fn find_many(&self, filter: mongodb::bson::Document) -> Result<Vec<Comment>, AppError> {
        use crate::db::mongo::db_err;
        use futures::TryStreamExt;

        self.collection
            .find(filter)
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)
    }
}

#[cfg(feature = "server")]
#[async_trait]
impl CommentRepository for MongoCommentRepository {
    /// Touches the parent document in the same transaction, so a concurrent
    /// cascade delete either sees this comment or makes the insert fail.
    async fn insert(&self, comment: Comment) -> Result<(), AppError> {
        use crate::db::mongo::db_err;
        use mongodb::bson::{doc, to_bson};

        let touched = to_bson(&comment.created_at)
            .map_err(|e| AppError::Internal(format!("Failed to encode timestamp: {}", e)))?;

        let mut session = self.client.start_session().await.map_err(db_err)?;
        session.start_transaction().await.map_err(db_err)?;

        let parent = self
            .documents
            .update_one(
                doc! { "_id": comment.document_id.as_str() },
                doc! { "$set": { "last_comment_at": touched } },
            )
            .session(&mut session)
            .await
            .map_err(db_err)?;

        if parent.matched_count == 0 {
            session.abort_transaction().await.map_err(db_err)?;
            return Err(AppError::NotFound(format!(
                "Document '{}' not found",
                comment.document_id
            )));
        }

        self.collection
            .insert_one(&comment)
            .session(&mut session)
            .await
            .map_err(db_err)?;

        session.commit_transaction().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Comment>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn list_for_document(
        &self,
        document_id: &str,
        active_only: bool,
    ) -> Result<Vec<Comment>, AppError> {
        use mongodb::bson::doc;

        let mut filter = doc! { "document_id": document_id };
        if active_only {
            filter.insert("is_active", true);
        }

        let mut comments = self.find_many(filter).await?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn list_for_documents(
        &self,
        document_ids: Option<&[DocumentId]>,
    ) -> Result<Vec<Comment>, AppError> {
        use mongodb::bson::doc;

        let filter = match document_ids {
            Some(ids) => doc! { "document_id": { "$in": ids.to_vec() } },
            None => doc! {},
        };

        let mut comments = self.find_many(filter).await?;
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(crate::db::mongo::db_err)?;
        Ok(result.deleted_count > 0)
    }

    async fn set_active(
        &self,
        ids: &[String],
        within: Option<&[DocumentId]>,
        active: bool,
    ) -> Result<u64, AppError> {
        use mongodb::bson::doc;

        let mut filter = doc! { "_id": { "$in": ids.to_vec() } };
        if let Some(documents) = within {
            filter.insert("document_id", doc! { "$in": documents.to_vec() });
        }

        let result = self
            .collection
            .update_many(filter, doc! { "$set": { "is_active": active } })
            .await
            .map_err(crate::db::mongo::db_err)?;
        Ok(result.matched_count)
    }
}
