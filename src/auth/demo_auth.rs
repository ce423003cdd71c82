use serde::{Deserialize, Serialize};

use crate::auth::models::{AuthenticatedUser, Grants, Role};
use crate::error::AppError;

/// Built-in demo user definition.
#[derive(Debug, Clone)]
pub struct DemoUser {
    pub username: &'static str,
    pub password: &'static str,
    pub role: Role,
    /// Slug of the seeded department, `None` for unassigned users.
    pub department: Option<&'static str>,
    pub grants: Grants,
    pub position: &'static str,
}

/// The demo users available when `demo_mode` is on. Seeded at startup.
pub const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        username: "admin",
        password: "admin",
        role: Role::Admin,
        department: None,
        grants: Grants::empty(),
        position: "Administrator",
    },
    DemoUser {
        username: "it-manager",
        password: "it-manager",
        role: Role::Manager,
        department: Some("it"),
        grants: Grants::empty(),
        position: "Head of IT",
    },
    DemoUser {
        username: "it-employee",
        password: "it-employee",
        role: Role::Employee,
        department: Some("it"),
        grants: Grants::empty(),
        position: "Support engineer",
    },
    DemoUser {
        username: "it-editor",
        password: "it-editor",
        role: Role::Employee,
        department: Some("it"),
        grants: Grants::MANAGE_DOCUMENTS,
        position: "Technical writer",
    },
    DemoUser {
        username: "hr-employee",
        password: "hr-employee",
        role: Role::Employee,
        department: Some("hr"),
        grants: Grants::empty(),
        position: "Recruiter",
    },
    DemoUser {
        username: "newcomer",
        password: "newcomer",
        role: Role::Employee,
        department: None,
        grants: Grants::empty(),
        position: "",
    },
];

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: AuthenticatedUser,
}

/// Validate demo credentials and return the matching demo user.
pub fn authenticate_demo_user(username: &str, password: &str) -> Result<&'static DemoUser, AppError> {
    DEMO_USERS
        .iter()
        .find(|u| u.username == username && u.password == password)
        .ok_or_else(|| AppError::Auth("Invalid username or password".into()))
}

/// `POST /api/auth/login`: demo login.
///
/// Validates credentials against the built-in user table and the seeded
/// account. On success, sets the session cookie and returns the user info.
#[cfg(feature = "server")]
pub async fn login_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    jar: axum_extra::extract::CookieJar,
    axum::Json(req): axum::Json<LoginRequest>,
) -> Result<(axum_extra::extract::CookieJar, axum::Json<LoginResponse>), AppError> {
    use crate::auth::middleware::SESSION_COOKIE;

    if !state.demo_mode {
        return Err(AppError::NotFound("Demo login is disabled".into()));
    }

    let demo = authenticate_demo_user(&req.username, &req.password)?;
    let stored = state
        .repos
        .users
        .find_by_username(demo.username)
        .await?
        .ok_or_else(|| AppError::Auth(format!("User '{}' has not been seeded", demo.username)))?;
    let user = stored.principal();

    let cookie = axum_extra::extract::cookie::Cookie::build((SESSION_COOKIE, stored.id))
        .path("/")
        .http_only(true)
        .same_site(axum_extra::extract::cookie::SameSite::Lax)
        .build();

    tracing::info!(user = %user.username, role = %user.role, "demo login");

    Ok((
        jar.add(cookie),
        axum::Json(LoginResponse {
            message: "Login successful".to_string(),
            user,
        }),
    ))
}

/// `GET /api/auth/me`: the current user.
#[cfg(feature = "server")]
pub async fn me_handler(
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
) -> axum::Json<AuthenticatedUser> {
    axum::Json(user)
}

/// `POST /api/auth/logout`: clears the session cookie.
#[cfg(feature = "server")]
pub async fn logout_handler(
    jar: axum_extra::extract::CookieJar,
) -> axum_extra::extract::CookieJar {
    let cookie =
        axum_extra::extract::cookie::Cookie::build((crate::auth::middleware::SESSION_COOKIE, ""))
            .path("/")
            .removal()
            .build();

    jar.remove(cookie)
}
