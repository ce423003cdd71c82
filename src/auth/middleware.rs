use crate::auth::models::AuthenticatedUser;
use crate::db::user_repository::UserRepository;
use crate::error::AppError;

/// Name of the cookie carrying the session (the stored user's id).
pub const SESSION_COOKIE: &str = "deptkb_session";

/// Resolve a session cookie value into the current principal.
///
/// The stored user is reloaded on every request, so role and department
/// changes apply immediately.
pub async fn resolve_session(
    users: &dyn UserRepository,
    session: Option<&str>,
) -> Result<AuthenticatedUser, AppError> {
    let user_id = session
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Auth("Not logged in".into()))?;

    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid session".into()))?;

    Ok(user.principal())
}

/// Extractor for the authenticated user of a request.
///
/// Rejects with `401` when there is no valid session.
#[cfg(feature = "server")]
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

#[cfg(feature = "server")]
impl axum::extract::FromRequestParts<crate::app::AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &crate::app::AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = axum_extra::extract::CookieJar::from_headers(&parts.headers);
        let session = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

        resolve_session(state.repos.users.as_ref(), session.as_deref())
            .await
            .map(CurrentUser)
    }
}
