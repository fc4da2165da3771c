//! # Katalogo (users & items catalogue API)
//!
//! `katalogo` is a small REST service exposing two resources, users and
//! items, backed by a SQLite store accessed through `sqlx`.
//!
//! ## Data Model
//!
//! Users own zero or more items (`items.user_id` is a foreign key to
//! `users.id`). Ids are assigned by the store on insert and never change.
//!
//! - **Email uniqueness:** no two users may share the same email value.
//! - **Referential integrity:** every item's owner must exist at the time
//!   the item is created or re-homed.
//! - **Restricted deletes:** a user who still owns items cannot be deleted.
//!
//! ## Write Gating
//!
//! Every mutating handler runs an application-level check (see
//! `api::handlers::catalog::policy`) before touching the store so callers
//! get a typed `400`/`404` instead of a leaked constraint violation. The
//! check and the write are not atomic; the store's own UNIQUE and FOREIGN
//! KEY constraints are the backstop under concurrent writers, and the
//! storage layer maps those violations back to the same error kinds.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
