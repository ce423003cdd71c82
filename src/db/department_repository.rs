use async_trait::async_trait;

use crate::db::models::Department;
use crate::error::AppError;

/// Repository trait for departments.
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// Insert a department. Names and slugs are unique; a collision is an
    /// [`AppError::Conflict`].
    async fn insert(&self, department: Department) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Department>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Department>, AppError>;

    /// All departments, ordered by name.
    async fn list(&self) -> Result<Vec<Department>, AppError>;
}

/// MongoDB implementation of the DepartmentRepository.
#[cfg(feature = "server")]
pub struct MongoDepartmentRepository {
    collection: mongodb::Collection<Department>,
}

#[cfg(feature = "server")]
impl MongoDepartmentRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("departments"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use crate::db::mongo::{db_err, unique_index};

        self.collection
            .create_indexes([unique_index("name"), unique_index("slug")])
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(feature = "server")]
#[async_trait]
impl DepartmentRepository for MongoDepartmentRepository {
    async fn insert(&self, department: Department) -> Result<(), AppError> {
        use crate::db::mongo::{db_err, is_duplicate_key};

        self.collection.insert_one(&department).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict(format!("department '{}' already exists", department.name))
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Department>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Department>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "slug": slug })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn list(&self) -> Result<Vec<Department>, AppError> {
        use crate::db::mongo::db_err;
        use futures::TryStreamExt;
        use mongodb::bson::doc;

        self.collection
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)
    }
}
