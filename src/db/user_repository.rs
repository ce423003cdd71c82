use async_trait::async_trait;

use crate::access::Scope;
use crate::db::models::User;
use crate::error::AppError;

/// Repository trait for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Fails with [`AppError::Conflict`] when the
    /// username is taken.
    async fn insert(&self, user: User) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Users admitted by `scope`, ordered by username.
    async fn list(&self, scope: &Scope) -> Result<Vec<User>, AppError>;

    /// Assign a user's department.
    async fn set_department(&self, id: &str, department_id: &str) -> Result<(), AppError>;
}

/// MongoDB implementation of the UserRepository.
#[cfg(feature = "server")]
pub struct MongoUserRepository {
    collection: mongodb::Collection<User>,
}

#[cfg(feature = "server")]
impl MongoUserRepository {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), AppError> {
        use crate::db::mongo::{db_err, unique_index};

        self.collection
            .create_index(unique_index("username"))
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(feature = "server")]
#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: User) -> Result<(), AppError> {
        use crate::db::mongo::{db_err, is_duplicate_key};

        self.collection.insert_one(&user).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict(format!("user '{}' already exists", user.username))
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        use mongodb::bson::doc;

        self.collection
            .find_one(doc! { "username": username })
            .await
            .map_err(crate::db::mongo::db_err)
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<User>, AppError> {
        use crate::db::mongo::{db_err, scope_filter};
        use futures::TryStreamExt;
        use mongodb::bson::doc;

        self.collection
            .find(scope_filter(scope, "department_id"))
            .sort(doc! { "username": 1 })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)
    }

    async fn set_department(&self, id: &str, department_id: &str) -> Result<(), AppError> {
        use mongodb::bson::doc;

        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "department_id": department_id } },
            )
            .await
            .map_err(crate::db::mongo::db_err)?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User '{}' not found", id)));
        }
        Ok(())
    }
}
