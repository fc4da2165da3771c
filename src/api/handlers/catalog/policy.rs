//! Pre-write integrity checks for catalogue mutations.
//!
//! Each check is a stateless, single-shot decision against current store
//! contents: it never mutates anything, and a failure short-circuits the
//! handler before the repository write runs. Checks are skipped when the
//! relevant field is unchanged, since the existing row already satisfies
//! the invariant. The check and the following write are not one
//! transaction; `storage` re-maps store constraint violations for writers
//! that race in between.

use sqlx::SqlitePool;

use super::storage::{self, CatalogError, ItemRow, UserRow};

/// Gate user creation on the candidate email being unused.
pub(super) async fn ensure_email_available(
    pool: &SqlitePool,
    email: &str,
) -> Result<(), CatalogError> {
    if storage::user_email_taken(pool, email)
        .await
        .map_err(CatalogError::Database)?
    {
        return Err(CatalogError::Conflict("Email already in use"));
    }
    Ok(())
}

/// Gate a user update: only a changed email re-runs the uniqueness check,
/// so a patch repeating the user's own email cannot self-collide.
pub(super) async fn ensure_email_available_on_update(
    pool: &SqlitePool,
    current: &UserRow,
    new_email: Option<&str>,
) -> Result<(), CatalogError> {
    match new_email {
        Some(email) if email != current.email => ensure_email_available(pool, email).await,
        _ => Ok(()),
    }
}

/// Gate item creation on the owning user existing.
pub(super) async fn ensure_owner_exists(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<(), CatalogError> {
    if !storage::user_exists(pool, user_id)
        .await
        .map_err(CatalogError::Database)?
    {
        return Err(CatalogError::NotFound("User not found"));
    }
    Ok(())
}

/// Gate an item update: only a changed owner id is looked up; the current
/// owner is already known to exist.
pub(super) async fn ensure_owner_exists_on_update(
    pool: &SqlitePool,
    current: &ItemRow,
    new_owner: Option<i64>,
) -> Result<(), CatalogError> {
    match new_owner {
        Some(user_id) if user_id != current.user_id => ensure_owner_exists(pool, user_id).await,
        _ => Ok(()),
    }
}

/// Gate user deletion: a user who still owns items cannot be removed.
pub(super) async fn ensure_no_owned_items(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<(), CatalogError> {
    if storage::user_owns_items(pool, user_id)
        .await
        .map_err(CatalogError::Database)?
    {
        return Err(CatalogError::Conflict("User still owns items"));
    }
    Ok(())
}
