pub mod access;
pub mod error;
pub mod forms;
pub mod demo_seeder;
pub mod auth {
    pub mod models;
    pub mod middleware;
    pub mod demo_auth;
}
pub mod db {
    pub mod models;
    #[cfg(feature = "server")]
    pub(crate) mod mongo;
    pub mod department_repository;
    pub mod user_repository;
    pub mod category_repository;
    pub mod document_repository;
    pub mod comment_repository;
    pub mod memory;
    pub mod repositories;
}
pub mod storage {
    pub mod client;
    pub mod memory;
}
pub mod api {
    pub mod documents;
    pub mod comments;
    pub mod departments;
    pub mod upload;
    #[cfg(feature = "server")]
    pub mod errors;
}

#[cfg(feature = "server")]
pub mod app;
#[cfg(feature = "server")]
pub mod config;
