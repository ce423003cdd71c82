use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::demo_auth;
use crate::db::repositories::Repositories;
use crate::forms::MAX_UPLOAD_BYTES;
use crate::storage::client::StorageClient;

/// Shared state of every request handler.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub storage: Arc<dyn StorageClient>,
    /// Enables the demo login endpoint.
    pub demo_mode: bool,
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // Oversized uploads must reach validation instead of failing on the body limit.
    let upload_limit = DefaultBodyLimit::max((MAX_UPLOAD_BYTES * 2) as usize);

    Router::new()
        .route("/api/auth/login", post(demo_auth::login_handler))
        .route("/api/auth/me", get(demo_auth::me_handler))
        .route("/api/auth/logout", post(demo_auth::logout_handler))
        .route(
            "/api/v1/documents",
            get(api::documents::list_documents_handler)
                .post(api::documents::create_document_handler),
        )
        .route(
            "/api/v1/documents/{slug}",
            get(api::documents::get_document_handler)
                .put(api::documents::update_document_handler)
                .delete(api::documents::delete_document_handler),
        )
        .route(
            "/api/v1/documents/{slug}/comments",
            post(api::comments::add_comment_handler),
        )
        .route(
            "/api/v1/documents/{slug}/file",
            post(api::upload::attach_file_handler)
                .get(api::upload::download_file_handler)
                .layer(upload_limit),
        )
        .route(
            "/api/v1/comments/{id}",
            delete(api::comments::delete_comment_handler),
        )
        .route(
            "/api/v1/departments",
            get(api::departments::list_departments_handler)
                .post(api::departments::create_department_handler),
        )
        .route(
            "/api/v1/categories",
            get(api::departments::list_categories_handler)
                .post(api::departments::create_category_handler),
        )
        .route(
            "/api/v1/me/department",
            post(api::departments::select_department_handler),
        )
        .route(
            "/api/v1/admin/documents/publish",
            post(api::documents::publish_handler),
        )
        .route(
            "/api/v1/admin/comments",
            get(api::comments::list_moderation_handler),
        )
        .route(
            "/api/v1/admin/comments/moderate",
            post(api::comments::moderate_handler),
        )
        .route(
            "/api/v1/admin/users",
            get(api::departments::list_users_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
