//! Handler tests for the users and items APIs.
//!
//! These tests apply the real schema to an in-memory SQLite pool, mount the
//! same routes the server wires, and exercise the Axum router end-to-end.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Extension, Router,
};
use serde_json::{json, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use tower::ServiceExt;

use crate::api::{self, SCHEMA_SQL};

/// Creates a fresh in-memory database with the embedded schema applied.
/// A single connection keeps every query on the same in-memory store.
async fn test_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .context("failed to connect test pool")?;

    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&pool)
        .await
        .context("failed to apply schema")?;

    Ok(pool)
}

/// Builds the production router over the given pool for end-to-end tests.
fn app_router(pool: SqlitePool) -> Router {
    let (router, _openapi) = api::router().split_for_parts();
    router.layer(Extension(pool))
}

/// Sends a request with a JSON body and returns the status plus decoded body.
async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    payload: &Value,
) -> Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))?,
        )
        .await?;
    decode(response).await
}

/// Sends a body-less request and returns the status plus decoded body.
async fn send(app: &Router, method: &str, uri: &str) -> Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty())?)
        .await?;
    decode(response).await
}

async fn decode(response: axum::response::Response) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).context("response body is not JSON")?
    };
    Ok((status, body))
}

/// Creates a user through the API and returns its assigned id.
async fn create_user(app: &Router, email: &str) -> Result<i64> {
    let payload = json!({ "name": "Test User", "email": email, "address": null });
    let (status, body) = send_json(app, "POST", "/users/", &payload).await?;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().context("created user has no id")
}

/// Creates an item owned by `user_id` through the API and returns its id.
async fn create_item(app: &Router, user_id: i64, title: &str) -> Result<i64> {
    let payload = json!({ "title": title, "description": "foo bar 123", "user_id": user_id });
    let (status, body) = send_json(app, "POST", "/items/", &payload).await?;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().context("created item has no id")
}

#[tokio::test]
/// A valid create returns the input fields plus an assigned integer id, and
/// a follow-up get returns the same record.
async fn user_create_then_get_round_trips() -> Result<()> {
    let app = app_router(test_pool().await?);

    let payload = json!({
        "name": "John Doe",
        "email": "test@mail.com",
        "address": "some addr"
    });
    let (status, created) = send_json(&app, "POST", "/users/", &payload).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "John Doe");
    assert_eq!(created["email"], "test@mail.com");
    assert_eq!(created["address"], "some addr");
    assert_eq!(created["items"], json!([]));
    let id = created["id"].as_i64().context("id missing")?;

    let (status, fetched) = send(&app, "GET", &format!("/users/{id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    Ok(())
}

#[tokio::test]
/// A second user with the same email is rejected with the conflict detail;
/// a different email goes through.
async fn user_duplicate_email_conflicts() -> Result<()> {
    let app = app_router(test_pool().await?);

    let payload = json!({
        "name": "John Doe",
        "email": "test@mail.com",
        "address": "some addr"
    });
    let (status, _) = send_json(&app, "POST", "/users/", &payload).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_json(&app, "POST", "/users/", &payload).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already in use");

    let other = json!({
        "name": "John Doe",
        "email": "other@mail.com",
        "address": "some addr"
    });
    let (status, _) = send_json(&app, "POST", "/users/", &other).await?;
    assert_eq!(status, StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
/// Payloads violating the field constraints fail with per-field detail
/// before any policy or storage call.
async fn user_payload_validation_fails_first() -> Result<()> {
    let app = app_router(test_pool().await?);

    let payload = json!({
        "name": "n".repeat(101),
        "email": "not-an-email",
        "address": "a".repeat(501)
    });
    let (status, body) = send_json(&app, "POST", "/users/", &payload).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let problems = body["detail"].as_array().context("detail not an array")?;
    assert_eq!(problems.len(), 3);
    assert!(problems.iter().any(|p| p["field"] == "name"));
    assert!(problems.iter().any(|p| p["field"] == "email"));
    assert!(problems.iter().any(|p| p["field"] == "address"));

    // Nothing was persisted.
    let (status, body) = send(&app, "GET", "/users/").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    Ok(())
}

#[tokio::test]
/// Updating a user with a taken email conflicts; repeating the user's own
/// email or patching other fields does not re-run the uniqueness check.
async fn user_update_email_rules() -> Result<()> {
    let app = app_router(test_pool().await?);
    let first = create_user(&app, "first@mail.com").await?;
    let second = create_user(&app, "second@mail.com").await?;

    let (status, body) =
        send_json(&app, "PUT", &format!("/users/{second}"), &json!({ "email": "first@mail.com" }))
            .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already in use");

    // Same email again is not a self-collision.
    let (status, body) =
        send_json(&app, "PUT", &format!("/users/{second}"), &json!({ "email": "second@mail.com" }))
            .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "second@mail.com");

    // A patch without the email slot leaves it unchanged.
    let (status, body) =
        send_json(&app, "PUT", &format!("/users/{first}"), &json!({ "name": "Renamed" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["email"], "first@mail.com");

    let (status, _) =
        send_json(&app, "PUT", "/users/999", &json!({ "name": "Ghost" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
/// Deleting a user removes it; deleting an unknown id reports not found.
async fn user_delete_then_get_is_absent() -> Result<()> {
    let app = app_router(test_pool().await?);
    let id = create_user(&app, "gone@mail.com").await?;

    let (status, body) = send(&app, "DELETE", &format!("/users/{id}")).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, "GET", &format!("/users/{id}")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");

    let (status, body) = send(&app, "DELETE", "/users/999").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");

    Ok(())
}

#[tokio::test]
/// A user who still owns items cannot be deleted until the items go first.
async fn user_delete_restricted_while_owning_items() -> Result<()> {
    let app = app_router(test_pool().await?);
    let user_id = create_user(&app, "owner@mail.com").await?;
    let item_id = create_item(&app, user_id, "book").await?;

    let (status, body) = send(&app, "DELETE", &format!("/users/{user_id}")).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "User still owns items");

    let (status, _) = send(&app, "DELETE", &format!("/items/{item_id}")).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "DELETE", &format!("/users/{user_id}")).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
/// The user list embeds each user's items.
async fn user_list_embeds_items() -> Result<()> {
    let app = app_router(test_pool().await?);
    let first = create_user(&app, "first@mail.com").await?;
    let second = create_user(&app, "second@mail.com").await?;
    create_item(&app, first, "book").await?;
    create_item(&app, first, "lamp").await?;

    let (status, body) = send(&app, "GET", "/users/").await?;
    assert_eq!(status, StatusCode::OK);

    let users = body.as_array().context("body not an array")?;
    assert_eq!(users.len(), 2);

    let first_user = users
        .iter()
        .find(|u| u["id"] == json!(first))
        .context("first user missing")?;
    let titles: Vec<&str> = first_user["items"]
        .as_array()
        .context("items not an array")?
        .iter()
        .filter_map(|i| i["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["book", "lamp"]);

    let second_user = users
        .iter()
        .find(|u| u["id"] == json!(second))
        .context("second user missing")?;
    assert_eq!(second_user["items"], json!([]));

    Ok(())
}

#[tokio::test]
/// Creating an item against a missing owner fails and persists nothing.
async fn item_create_requires_existing_owner() -> Result<()> {
    let app = app_router(test_pool().await?);

    let payload = json!({
        "title": "book",
        "description": "foo bar 123",
        "user_id": 999
    });
    let (status, body) = send_json(&app, "POST", "/items/", &payload).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");

    let (status, body) = send(&app, "GET", "/items/").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    Ok(())
}

#[tokio::test]
/// A created item echoes its fields and can be fetched by id.
async fn item_create_then_get_round_trips() -> Result<()> {
    let app = app_router(test_pool().await?);
    let user_id = create_user(&app, "owner@mail.com").await?;

    let payload = json!({
        "title": "book",
        "description": "foo bar 123",
        "user_id": user_id
    });
    let (status, created) = send_json(&app, "POST", "/items/", &payload).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "book");
    assert_eq!(created["description"], "foo bar 123");
    assert_eq!(created["user_id"], json!(user_id));
    let id = created["id"].as_i64().context("id missing")?;

    let (status, fetched) = send(&app, "GET", &format!("/items/{id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, body) = send(&app, "GET", "/items/999").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Item not found");

    Ok(())
}

#[tokio::test]
/// Patching only the title leaves description and owner untouched.
async fn item_partial_update_keeps_absent_fields() -> Result<()> {
    let app = app_router(test_pool().await?);
    let user_id = create_user(&app, "owner@mail.com").await?;
    let item_id = create_item(&app, user_id, "book").await?;

    let (status, body) =
        send_json(&app, "PUT", &format!("/items/{item_id}"), &json!({ "title": "novel" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "novel");
    assert_eq!(body["description"], "foo bar 123");
    assert_eq!(body["user_id"], json!(user_id));

    Ok(())
}

#[tokio::test]
/// Re-homing an item checks the new owner; the current owner is trusted.
async fn item_update_owner_rules() -> Result<()> {
    let app = app_router(test_pool().await?);
    let first = create_user(&app, "first@mail.com").await?;
    let second = create_user(&app, "second@mail.com").await?;
    let item_id = create_item(&app, first, "book").await?;

    let (status, body) =
        send_json(&app, "PUT", &format!("/items/{item_id}"), &json!({ "user_id": second }))
            .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], json!(second));

    let (status, body) =
        send_json(&app, "PUT", &format!("/items/{item_id}"), &json!({ "user_id": 999 })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");

    let (status, body) =
        send_json(&app, "PUT", "/items/999", &json!({ "title": "ghost" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Item not found");

    Ok(())
}

#[tokio::test]
/// Item payload validation rejects out-of-range titles and descriptions.
async fn item_payload_validation() -> Result<()> {
    let app = app_router(test_pool().await?);
    let user_id = create_user(&app, "owner@mail.com").await?;

    let payload = json!({ "title": "x", "description": null, "user_id": user_id });
    let (status, body) = send_json(&app, "POST", "/items/", &payload).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let problems = body["detail"].as_array().context("detail not an array")?;
    assert!(problems.iter().any(|p| p["field"] == "title"));

    let payload = json!({
        "title": "book",
        "description": "d".repeat(501),
        "user_id": user_id
    });
    let (status, _) = send_json(&app, "POST", "/items/", &payload).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
/// Deleting an item removes it; deleting an unknown id reports not found.
async fn item_delete_then_get_is_absent() -> Result<()> {
    let app = app_router(test_pool().await?);
    let user_id = create_user(&app, "owner@mail.com").await?;
    let item_id = create_item(&app, user_id, "book").await?;

    let (status, _) = send(&app, "DELETE", &format!("/items/{item_id}")).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &format!("/items/{item_id}")).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Item not found");

    let (status, body) = send(&app, "DELETE", "/items/999").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Item not found");

    Ok(())
}

#[tokio::test]
/// The health endpoint reports the database as reachable.
async fn health_reports_database_ok() -> Result<()> {
    let app = app_router(test_pool().await?);

    let (status, body) = send(&app, "GET", "/health").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["database"], "ok");

    Ok(())
}
