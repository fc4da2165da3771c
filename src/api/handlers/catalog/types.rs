//! Request/response types for the users and items APIs.
//!
//! These payloads are shared between handlers and `OpenAPI` generation.
//! Update requests carry one optional slot per mutable field; a field left
//! out of the payload keeps its stored value.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ADDRESS_MAX, DESCRIPTION_MAX, EMAIL_MAX, NAME_MAX, TITLE_MAX, TITLE_MIN};
use crate::api::handlers::valid_email;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub address: Option<String>,
    pub items: Vec<ItemResponse>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ItemResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
}

/// A single field constraint violation, reported under `detail` in `422`
/// responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl CreateUserRequest {
    /// Field constraint check; an empty result means the payload is valid.
    pub(super) fn validate(&self) -> Vec<FieldError> {
        check_user_fields(
            self.name.as_deref(),
            Some(&self.email),
            self.address.as_deref(),
        )
    }
}

impl UpdateUserRequest {
    pub(super) fn validate(&self) -> Vec<FieldError> {
        check_user_fields(
            self.name.as_deref(),
            self.email.as_deref(),
            self.address.as_deref(),
        )
    }
}

impl CreateItemRequest {
    pub(super) fn validate(&self) -> Vec<FieldError> {
        check_item_fields(Some(&self.title), self.description.as_deref())
    }
}

impl UpdateItemRequest {
    pub(super) fn validate(&self) -> Vec<FieldError> {
        check_item_fields(self.title.as_deref(), self.description.as_deref())
    }
}

// Limits are counted in characters, not bytes.
fn check_user_fields(
    name: Option<&str>,
    email: Option<&str>,
    address: Option<&str>,
) -> Vec<FieldError> {
    let mut problems = Vec::new();

    if let Some(name) = name {
        if name.chars().count() > NAME_MAX {
            problems.push(FieldError {
                field: "name",
                message: "must be at most 100 characters",
            });
        }
    }

    if let Some(email) = email {
        if email.chars().count() > EMAIL_MAX {
            problems.push(FieldError {
                field: "email",
                message: "must be at most 100 characters",
            });
        } else if !valid_email(email) {
            problems.push(FieldError {
                field: "email",
                message: "must be a valid email address",
            });
        }
    }

    if let Some(address) = address {
        if address.chars().count() > ADDRESS_MAX {
            problems.push(FieldError {
                field: "address",
                message: "must be at most 500 characters",
            });
        }
    }

    problems
}

fn check_item_fields(title: Option<&str>, description: Option<&str>) -> Vec<FieldError> {
    let mut problems = Vec::new();

    if let Some(title) = title {
        let length = title.chars().count();
        if length < TITLE_MIN || length > TITLE_MAX {
            problems.push(FieldError {
                field: "title",
                message: "must be between 2 and 100 characters",
            });
        }
    }

    if let Some(description) = description {
        if description.chars().count() > DESCRIPTION_MAX {
            problems.push(FieldError {
                field: "description",
                message: "must be at most 500 characters",
            });
        }
    }

    problems
}
