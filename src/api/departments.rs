use serde::{Deserialize, Serialize};

use crate::access::{self, Operation, Resource, ResourceKind};
use crate::auth::models::AuthenticatedUser;
use crate::db::models::{slugify, Category, Department, DepartmentId, User};
use crate::db::repositories::Repositories;
use crate::error::AppError;

/// Payload for creating a department.
#[derive(Debug, Deserialize)]
pub struct DepartmentForm {
    pub name: String,
    /// Derived from the name when absent.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Payload for creating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    /// Defaults to the creator's department.
    #[serde(default)]
    pub department: Option<DepartmentId>,
    #[serde(default)]
    pub description: String,
}

/// Payload for choosing one's own department.
#[derive(Debug, Deserialize)]
pub struct SelectDepartment {
    pub department: DepartmentId,
}

/// A user row of the admin user list.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub role: crate::auth::models::Role,
    pub department: Option<DepartmentId>,
    pub position: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            department: user.department_id,
            position: user.position,
        }
    }
}

pub async fn process_list_departments(
    repos: &Repositories,
    user: &AuthenticatedUser,
) -> Result<Vec<Department>, AppError> {
    access::scope(Some(user), Operation::List, ResourceKind::Department)?;
    repos.departments.list().await
}

pub async fn process_create_department(
    repos: &Repositories,
    user: &AuthenticatedUser,
    form: DepartmentForm,
) -> Result<Department, AppError> {
    access::require(user, Operation::Create, Resource::Kind(ResourceKind::Department))?;

    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "Name is required"));
    }
    let slug = form.slug.as_deref().map(slugify);
    let department = Department::new(name, slug.as_deref(), form.description.trim());
    if department.slug.is_empty() {
        return Err(AppError::validation(
            "slug",
            "A slug is required when the name has no latin letters or digits",
        ));
    }

    repos.departments.insert(department.clone()).await?;
    tracing::info!(slug = %department.slug, by = %user.username, "department created");
    Ok(department)
}

pub async fn process_list_categories(
    repos: &Repositories,
    user: &AuthenticatedUser,
) -> Result<Vec<Category>, AppError> {
    let scope = access::scope(Some(user), Operation::List, ResourceKind::Category)?;
    repos.categories.list(&scope).await
}

pub async fn process_create_category(
    repos: &Repositories,
    user: &AuthenticatedUser,
    form: CategoryForm,
) -> Result<Category, AppError> {
    access::require(user, Operation::Create, Resource::Kind(ResourceKind::Category))?;

    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "Name is required"));
    }

    let department_id = form
        .department
        .filter(|d| !d.is_empty())
        .or_else(|| user.department.clone())
        .ok_or_else(|| AppError::validation("department", "A department is required"))?;
    let department = repos
        .departments
        .find_by_id(&department_id)
        .await?
        .ok_or_else(|| AppError::validation("department", "Department not found"))?;

    let category = Category::new(name, &department.id, form.description.trim());
    access::require(user, Operation::Create, Resource::Category(&category))?;

    repos.categories.insert(category.clone()).await?;
    Ok(category)
}

/// Assign the caller's own department.
pub async fn process_select_department(
    repos: &Repositories,
    user: &AuthenticatedUser,
    request: SelectDepartment,
) -> Result<AuthenticatedUser, AppError> {
    let record = repos
        .users
        .find_by_id(&user.user_id)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid session".into()))?;
    access::require(user, Operation::AssignDepartment, Resource::User(&record))?;

    let department = repos
        .departments
        .find_by_id(&request.department)
        .await?
        .ok_or_else(|| AppError::validation("department", "Department not found"))?;

    repos.users.set_department(&record.id, &department.id).await?;
    tracing::info!(user = %record.username, department = %department.slug, "department selected");

    Ok(AuthenticatedUser {
        department: Some(department.id),
        ..user.clone()
    })
}

pub async fn process_list_users(
    repos: &Repositories,
    user: &AuthenticatedUser,
) -> Result<Vec<UserSummary>, AppError> {
    let scope = access::scope(Some(user), Operation::List, ResourceKind::User)?;
    let users = repos.users.list(&scope).await?;
    Ok(users.into_iter().map(UserSummary::from).collect())
}

/// `GET /api/v1/departments`
#[cfg(feature = "server")]
pub async fn list_departments_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
) -> Result<axum::Json<Vec<Department>>, AppError> {
    Ok(axum::Json(process_list_departments(&state.repos, &user).await?))
}

/// `POST /api/v1/departments`
#[cfg(feature = "server")]
pub async fn create_department_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::Json(form): axum::Json<DepartmentForm>,
) -> Result<(axum::http::StatusCode, axum::Json<Department>), AppError> {
    let department = process_create_department(&state.repos, &user, form).await?;
    Ok((axum::http::StatusCode::CREATED, axum::Json(department)))
}

/// `GET /api/v1/categories`
#[cfg(feature = "server")]
pub async fn list_categories_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
) -> Result<axum::Json<Vec<Category>>, AppError> {
    Ok(axum::Json(process_list_categories(&state.repos, &user).await?))
}

/// `POST /api/v1/categories`
#[cfg(feature = "server")]
pub async fn create_category_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::Json(form): axum::Json<CategoryForm>,
) -> Result<(axum::http::StatusCode, axum::Json<Category>), AppError> {
    let category = process_create_category(&state.repos, &user, form).await?;
    Ok((axum::http::StatusCode::CREATED, axum::Json(category)))
}

/// `POST /api/v1/me/department`
#[cfg(feature = "server")]
pub async fn select_department_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
    axum::Json(request): axum::Json<SelectDepartment>,
) -> Result<axum::Json<AuthenticatedUser>, AppError> {
    Ok(axum::Json(
        process_select_department(&state.repos, &user, request).await?,
    ))
}

/// `GET /api/v1/admin/users`
#[cfg(feature = "server")]
pub async fn list_users_handler(
    axum::extract::State(state): axum::extract::State<crate::app::AppState>,
    crate::auth::middleware::CurrentUser(user): crate::auth::middleware::CurrentUser,
) -> Result<axum::Json<Vec<UserSummary>>, AppError> {
    Ok(axum::Json(process_list_users(&state.repos, &user).await?))
}
