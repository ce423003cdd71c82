use std::sync::Arc;

use crate::db::category_repository::CategoryRepository;
use crate::db::comment_repository::CommentRepository;
use crate::db::department_repository::DepartmentRepository;
use crate::db::document_repository::DocumentRepository;
use crate::db::memory::InMemoryStore;
use crate::db::user_repository::UserRepository;

/// The full set of repositories the request handlers work against.
#[derive(Clone)]
pub struct Repositories {
    pub departments: Arc<dyn DepartmentRepository>,
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    /// Every repository backed by one shared [`InMemoryStore`].
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            departments: store.clone(),
            users: store.clone(),
            categories: store.clone(),
            documents: store.clone(),
            comments: store,
        }
    }

    /// MongoDB-backed repositories. Creates the unique indexes the
    /// conflict detection relies on.
    #[cfg(feature = "server")]
    pub async fn mongo(
        client: &mongodb::Client,
        database: &str,
    ) -> Result<Self, crate::error::AppError> {
        use crate::db::category_repository::MongoCategoryRepository;
        use crate::db::comment_repository::MongoCommentRepository;
        use crate::db::department_repository::MongoDepartmentRepository;
        use crate::db::document_repository::MongoDocumentRepository;
        use crate::db::user_repository::MongoUserRepository;

        let db = client.database(database);

        let departments = MongoDepartmentRepository::new(&db);
        departments.ensure_indexes().await?;
        let users = MongoUserRepository::new(&db);
        users.ensure_indexes().await?;
        let documents = MongoDocumentRepository::new(client, &db);
        documents.ensure_indexes().await?;
        let comments = MongoCommentRepository::new(client, &db);
        comments.ensure_indexes().await?;

        tracing::info!(database, "MongoDB repositories ready");

        Ok(Self {
            departments: Arc::new(departments),
            users: Arc::new(users),
            categories: Arc::new(MongoCategoryRepository::new(&db)),
            documents: Arc::new(documents),
            comments: Arc::new(comments),
        })
    }
}
