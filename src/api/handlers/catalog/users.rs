//! User CRUD handlers.
//!
//! This module implements the `/users/` endpoints and delegates database
//! access to the shared `storage` module. Email uniqueness is enforced by
//! `policy` before any write, and a user who still owns items cannot be
//! deleted.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;
use tracing::error;

use super::{
    policy,
    storage::{self, CatalogError},
    types::{CreateUserRequest, UpdateUserRequest, UserResponse},
};

#[utoipa::path(
    get,
    path = "/users/",
    responses(
        (status = 200, description = "List users with their items embedded.", body = [UserResponse]),
    ),
    tag = "users"
)]
/// Lists every user, each with their items embedded.
pub async fn list_users(pool: Extension<SqlitePool>) -> impl IntoResponse {
    match storage::fetch_users_with_items(&pool).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => {
            error!("Failed to list users: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User detail.", body = UserResponse),
        (status = 404, description = "User not found."),
    ),
    tag = "users"
)]
/// Fetches one user by id, with their items embedded.
pub async fn get_user(Path(id): Path<i64>, pool: Extension<SqlitePool>) -> impl IntoResponse {
    match storage::fetch_user_with_items(&pool, id).await {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => CatalogError::NotFound("User not found").into_response(),
        Err(err) => CatalogError::Database(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/users/",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created.", body = UserResponse),
        (status = 400, description = "Email already in use."),
        (status = 422, description = "Invalid payload."),
    ),
    tag = "users"
)]
/// Creates a new user and returns it with its store-assigned id.
/// The email must be unused; the uniqueness check runs before the insert
/// and the UNIQUE constraint backs it up.
pub async fn create_user(
    pool: Extension<SqlitePool>,
    Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
    let problems = payload.validate();
    if !problems.is_empty() {
        return CatalogError::Validation(problems).into_response();
    }

    if let Err(err) = policy::ensure_email_available(&pool, &payload.email).await {
        return err.into_response();
    }

    match storage::insert_user(&pool, &payload).await {
        Ok(user) => (StatusCode::CREATED, Json(user.into_response_with(Vec::new()))).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User updated.", body = UserResponse),
        (status = 400, description = "Email already in use."),
        (status = 404, description = "User not found."),
        (status = 422, description = "Invalid payload."),
    ),
    tag = "users"
)]
/// Updates a user; fields absent from the payload keep their stored value.
/// Only a changed email re-runs the uniqueness check.
pub async fn update_user(
    Path(id): Path<i64>,
    pool: Extension<SqlitePool>,
    Json(payload): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    let problems = payload.validate();
    if !problems.is_empty() {
        return CatalogError::Validation(problems).into_response();
    }

    let current = match storage::fetch_user(&pool, id).await {
        Ok(Some(user)) => user,
        Ok(None) => return CatalogError::NotFound("User not found").into_response(),
        Err(err) => return CatalogError::Database(err).into_response(),
    };

    if let Err(err) =
        policy::ensure_email_available_on_update(&pool, &current, payload.email.as_deref()).await
    {
        return err.into_response();
    }

    let updated = match storage::update_user(&pool, current.id, &payload).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match storage::fetch_items_for_user(&pool, updated.id).await {
        Ok(items) => (StatusCode::OK, Json(updated.into_response_with(items))).into_response(),
        Err(err) => CatalogError::Database(err).into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted."),
        (status = 400, description = "User still owns items."),
        (status = 404, description = "User not found."),
    ),
    tag = "users"
)]
/// Deletes a user by id. Deletion is restricted while the user owns items.
pub async fn delete_user(Path(id): Path<i64>, pool: Extension<SqlitePool>) -> impl IntoResponse {
    match storage::fetch_user(&pool, id).await {
        Ok(Some(_)) => {}
        Ok(None) => return CatalogError::NotFound("User not found").into_response(),
        Err(err) => return CatalogError::Database(err).into_response(),
    }

    if let Err(err) = policy::ensure_no_owned_items(&pool, id).await {
        return err.into_response();
    }

    match storage::delete_user(&pool, id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
