//! Shared SQL storage for the users and items tables.
//!
//! This module owns the row types, the typed error enum handlers translate
//! into HTTP responses, and every query the catalogue issues. Constraint
//! violations raised by the store are mapped to the same error kinds the
//! pre-write checks produce, covering writers that race past those checks.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::HashMap;
use tracing::error;

use super::types::{
    CreateItemRequest, CreateUserRequest, FieldError, ItemResponse, UpdateItemRequest,
    UpdateUserRequest, UserResponse,
};

#[derive(Debug)]
pub(super) struct UserRow {
    pub(super) id: i64,
    pub(super) name: Option<String>,
    pub(super) email: String,
    pub(super) address: Option<String>,
}

impl UserRow {
    /// Converts this row into the API response shape, embedding the user's
    /// items.
    pub(super) fn into_response_with(self, items: Vec<ItemResponse>) -> UserResponse {
        UserResponse {
            id: self.id,
            name: self.name,
            email: self.email,
            address: self.address,
            items,
        }
    }
}

#[derive(Debug)]
pub(super) struct ItemRow {
    pub(super) id: i64,
    pub(super) title: String,
    pub(super) description: Option<String>,
    pub(super) user_id: i64,
}

impl ItemRow {
    pub(super) fn into_response(self) -> ItemResponse {
        ItemResponse {
            id: self.id,
            title: self.title,
            description: self.description,
            user_id: self.user_id,
        }
    }
}

#[derive(Debug)]
pub(super) enum CatalogError {
    /// Field constraint violations, surfaced as `422` with per-field detail.
    Validation(Vec<FieldError>),
    /// A referenced id does not resolve, surfaced as `404`.
    NotFound(&'static str),
    /// A uniqueness or ownership restriction, surfaced as `400`.
    Conflict(&'static str),
    Database(sqlx::Error),
}

impl IntoResponse for CatalogError {
    /// Maps storage-layer failures into stable HTTP responses for handlers.
    /// Database errors are logged server-side and surfaced as `500` without leaking details.
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Validation(problems) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": problems })),
            )
                .into_response(),
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": message }))).into_response()
            }
            Self::Conflict(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": message }))).into_response()
            }
            Self::Database(err) => {
                error!("Database error: {err}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn user_from_row(row: &SqliteRow) -> UserRow {
    UserRow {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        address: row.get("address"),
    }
}

fn item_from_row(row: &SqliteRow) -> ItemRow {
    ItemRow {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        user_id: row.get("user_id"),
    }
}

/// Fetches every user with their items embedded, in insertion order.
pub(super) async fn fetch_users_with_items(
    pool: &SqlitePool,
) -> Result<Vec<UserResponse>, sqlx::Error> {
    let users = sqlx::query("SELECT id, name, email, address FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    let items = fetch_items(pool).await?;

    let mut grouped: HashMap<i64, Vec<ItemResponse>> = HashMap::new();
    for item in items {
        grouped.entry(item.user_id).or_default().push(item);
    }

    Ok(users
        .iter()
        .map(user_from_row)
        .map(|user| {
            let items = grouped.remove(&user.id).unwrap_or_default();
            user.into_response_with(items)
        })
        .collect())
}

pub(super) async fn fetch_user(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<UserRow>, sqlx::Error> {
    let row = sqlx::query("SELECT id, name, email, address FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

/// Fetches a user and their items in the API response shape.
pub(super) async fn fetch_user_with_items(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<UserResponse>, sqlx::Error> {
    let Some(user) = fetch_user(pool, id).await? else {
        return Ok(None);
    };
    let items = fetch_items_for_user(pool, id).await?;
    Ok(Some(user.into_response_with(items)))
}

pub(super) async fn user_email_taken(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1) AS taken")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(row.get("taken"))
}

pub(super) async fn user_exists(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1) AS found")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("found"))
}

pub(super) async fn user_owns_items(pool: &SqlitePool, user_id: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM items WHERE user_id = $1) AS owned")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("owned"))
}

/// Inserts a new user; the store assigns the id.
/// A uniqueness violation on email maps to the same `400` the pre-write
/// check produces, so a race between the two changes nothing for callers.
pub(super) async fn insert_user(
    pool: &SqlitePool,
    payload: &CreateUserRequest,
) -> Result<UserRow, CatalogError> {
    let insert = sqlx::query(
        r"
        INSERT INTO users (name, email, address)
        VALUES ($1, $2, $3)
        RETURNING id, name, email, address
        ",
    )
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.address)
    .fetch_one(pool)
    .await;

    match insert {
        Ok(row) => Ok(user_from_row(&row)),
        Err(err) => {
            if is_unique_violation(&err) {
                Err(CatalogError::Conflict("Email already in use"))
            } else {
                Err(CatalogError::Database(err))
            }
        }
    }
}

/// Applies a patch to a user row; absent fields keep their stored value.
pub(super) async fn update_user(
    pool: &SqlitePool,
    id: i64,
    patch: &UpdateUserRequest,
) -> Result<UserRow, CatalogError> {
    let update = sqlx::query(
        r"
        UPDATE users
        SET
            name = COALESCE($1, name),
            email = COALESCE($2, email),
            address = COALESCE($3, address)
        WHERE id = $4
        RETURNING id, name, email, address
        ",
    )
    .bind(&patch.name)
    .bind(&patch.email)
    .bind(&patch.address)
    .bind(id)
    .fetch_one(pool)
    .await;

    match update {
        Ok(row) => Ok(user_from_row(&row)),
        Err(sqlx::Error::RowNotFound) => Err(CatalogError::NotFound("User not found")),
        Err(err) => {
            if is_unique_violation(&err) {
                Err(CatalogError::Conflict("Email already in use"))
            } else {
                Err(CatalogError::Database(err))
            }
        }
    }
}

/// Deletes a user row; returns `false` when the id did not exist.
/// The FOREIGN KEY constraint backstops the ownership restriction.
pub(super) async fn delete_user(pool: &SqlitePool, id: i64) -> Result<bool, CatalogError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(err) => {
            if is_foreign_key_violation(&err) {
                Err(CatalogError::Conflict("User still owns items"))
            } else {
                Err(CatalogError::Database(err))
            }
        }
    }
}

pub(super) async fn fetch_items(pool: &SqlitePool) -> Result<Vec<ItemResponse>, sqlx::Error> {
    let rows = sqlx::query("SELECT id, title, description, user_id FROM items ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(item_from_row)
        .map(ItemRow::into_response)
        .collect())
}

pub(super) async fn fetch_item(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ItemRow>, sqlx::Error> {
    let row = sqlx::query("SELECT id, title, description, user_id FROM items WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.as_ref().map(item_from_row))
}

pub(super) async fn fetch_items_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<ItemResponse>, sqlx::Error> {
    let rows =
        sqlx::query("SELECT id, title, description, user_id FROM items WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows
        .iter()
        .map(item_from_row)
        .map(ItemRow::into_response)
        .collect())
}

/// Inserts a new item; the store assigns the id.
/// A foreign-key violation means the owner vanished between the pre-write
/// check and the insert, which callers see as the same `404`.
pub(super) async fn insert_item(
    pool: &SqlitePool,
    payload: &CreateItemRequest,
) -> Result<ItemRow, CatalogError> {
    let insert = sqlx::query(
        r"
        INSERT INTO items (title, description, user_id)
        VALUES ($1, $2, $3)
        RETURNING id, title, description, user_id
        ",
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.user_id)
    .fetch_one(pool)
    .await;

    match insert {
        Ok(row) => Ok(item_from_row(&row)),
        Err(err) => {
            if is_foreign_key_violation(&err) {
                Err(CatalogError::NotFound("User not found"))
            } else {
                Err(CatalogError::Database(err))
            }
        }
    }
}

/// Applies a patch to an item row; absent fields keep their stored value.
pub(super) async fn update_item(
    pool: &SqlitePool,
    id: i64,
    patch: &UpdateItemRequest,
) -> Result<ItemRow, CatalogError> {
    let update = sqlx::query(
        r"
        UPDATE items
        SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            user_id = COALESCE($3, user_id)
        WHERE id = $4
        RETURNING id, title, description, user_id
        ",
    )
    .bind(&patch.title)
    .bind(&patch.description)
    .bind(patch.user_id)
    .bind(id)
    .fetch_one(pool)
    .await;

    match update {
        Ok(row) => Ok(item_from_row(&row)),
        Err(sqlx::Error::RowNotFound) => Err(CatalogError::NotFound("Item not found")),
        Err(err) => {
            if is_foreign_key_violation(&err) {
                Err(CatalogError::NotFound("User not found"))
            } else {
                Err(CatalogError::Database(err))
            }
        }
    }
}

/// Deletes an item row; returns `false` when the id did not exist.
pub(super) async fn delete_item(pool: &SqlitePool, id: i64) -> Result<bool, CatalogError> {
    let result = sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await;

    match result {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(err) => Err(CatalogError::Database(err)),
    }
}

/// Returns `true` when `err` is a UNIQUE constraint violation.
/// SQLite extended result codes: 2067 = SQLITE_CONSTRAINT_UNIQUE,
/// 1555 = SQLITE_CONSTRAINT_PRIMARYKEY.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            matches!(db_err.code().as_deref(), Some("2067" | "1555"))
        }
        _ => false,
    }
}

/// Returns `true` when `err` is a FOREIGN KEY constraint violation
/// (SQLite extended result code 787).
fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("787"),
        _ => false,
    }
}
