use async_trait::async_trait;

use crate::access::Scope;
use crate::db::models::Category;
use crate::error::AppError;

/// Repository trait for document categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn insert(&self, category: Category) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, AppError>;

    /// Categories admitted by `scope`, ordered by name.
    async fn list(&self, scope: &Scope) -> Result<Vec<Category>, AppError>;
}

/// MongoDB implementation of the CategoryRepository.
#[cfg(feature = "server")]
pub struct MongoCategoryRepository {
    collection: mongodb::Collection<Category>,
}

#[cfg(feature = "server")]
impl MongoCategoryRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("categories"),
        }
    }
}

#[cfg(feature = "server")]
#[async_trait]
impl CategoryRepository for MongoCategoryRepository {
    async fn insert(&self, category: Category) -> Result<(), AppError> {
        self.collection
            .insert_one(&category)
            .await
            .map_err(crate::db::mongo::db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<Category>, AppError> {
        use crate::db::mongo::{db_err, scope_filter};
        use futures::TryStreamExt;
        use mongodb::bson::doc;

        self.collection
            .find(scope_filter(scope, "department_id"))
            .sort(doc! { "name": 1 })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)
    }
}
