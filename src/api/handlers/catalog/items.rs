//! Item CRUD handlers.
//!
//! This module implements the `/items/` endpoints. Every item must be owned
//! by an existing user; `policy` resolves the owner before a create or a
//! re-homing update, and the FOREIGN KEY constraint backs the check up.

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
    types::{CreateItemRequest, ItemResponse, UpdateItemRequest},
};

#[utoipa::path(
    get,
    path = "/items/",
    responses(
        (status = 200, description = "List items.", body = [ItemResponse]),
    ),
    tag = "items"
)]
/// Lists every item.
pub async fn list_items(pool: Extension<SqlitePool>) -> impl IntoResponse {
    match storage::fetch_items(&pool).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => {
            error!("Failed to list items: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item detail.", body = ItemResponse),
        (status = 404, description = "Item not found."),
    ),
    tag = "items"
)]
/// Fetches one item by id.
pub async fn get_item(Path(id): Path<i64>, pool: Extension<SqlitePool>) -> impl IntoResponse {
    match storage::fetch_item(&pool, id).await {
        Ok(Some(item)) => (StatusCode::OK, Json(item.into_response())).into_response(),
        Ok(None) => CatalogError::NotFound("Item not found").into_response(),
        Err(err) => CatalogError::Database(err).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/items/",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created.", body = ItemResponse),
        (status = 404, description = "Owning user not found."),
        (status = 422, description = "Invalid payload."),
    ),
    tag = "items"
)]
/// Creates a new item and returns it with its store-assigned id.
/// The owning user must exist; nothing is persisted when it does not.
pub async fn create_item(
    pool: Extension<SqlitePool>,
    Json(payload): Json<CreateItemRequest>,
) -> impl IntoResponse {
    let problems = payload.validate();
    if !problems.is_empty() {
        return CatalogError::Validation(problems).into_response();
    }

    if let Err(err) = policy::ensure_owner_exists(&pool, payload.user_id).await {
        return err.into_response();
    }

    match storage::insert_item(&pool, &payload).await {
        Ok(item) => (StatusCode::CREATED, Json(item.into_response())).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    put,
    path = "/items/{id}",
    request_body = UpdateItemRequest,
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "Item updated.", body = ItemResponse),
        (status = 404, description = "Item or owning user not found."),
        (status = 422, description = "Invalid payload."),
    ),
    tag = "items"
)]
/// Updates an item; fields absent from the payload keep their stored value.
/// Only a changed owner id is looked up before the write.
pub async fn update_item(
    Path(id): Path<i64>,
    pool: Extension<SqlitePool>,
    Json(payload): Json<UpdateItemRequest>,
) -> impl IntoResponse {
    let problems = payload.validate();
    if !problems.is_empty() {
        return CatalogError::Validation(problems).into_response();
    }

    let current = match storage::fetch_item(&pool, id).await {
        Ok(Some(item)) => item,
        Ok(None) => return CatalogError::NotFound("Item not found").into_response(),
        Err(err) => return CatalogError::Database(err).into_response(),
    };

    if let Err(err) =
        policy::ensure_owner_exists_on_update(&pool, &current, payload.user_id).await
    {
        return err.into_response();
    }

    match storage::update_item(&pool, current.id, &payload).await {
        Ok(item) => (StatusCode::OK, Json(item.into_response())).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted."),
        (status = 404, description = "Item not found."),
    ),
    tag = "items"
)]
/// Deletes an item by id.
pub async fn delete_item(Path(id): Path<i64>, pool: Extension<SqlitePool>) -> impl IntoResponse {
    match storage::fetch_item(&pool, id).await {
        Ok(Some(_)) => {}
        Ok(None) => return CatalogError::NotFound("Item not found").into_response(),
        Err(err) => return CatalogError::Database(err).into_response(),
    }

    match storage::delete_item(&pool, id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}
