//! Users and items endpoints.
//!
//! Users own items (`items.user_id` references `users.id`), and every write
//! is gated by the checks in `policy` so invariant violations surface as
//! typed `400`/`404` responses instead of raw store errors. The store's own
//! UNIQUE and FOREIGN KEY constraints remain the backstop for writers that
//! race in between the check and the write.
//!
//! This module is split into route-focused files plus a shared storage
//! layer so the HTTP surface stays easy to read and the SQL logic stays
//! easy to test. The handler modules only parse inputs and map the
//! high-level flow, while `storage` owns database queries and response
//! shaping and `policy` owns the pre-write invariant checks.
//!
//! Flow Overview:
//! 1) Deserialize the payload and validate its field constraints.
//! 2) Run the matching integrity check (email uniqueness, owner existence).
//! 3) Perform the single-row read/write and serialize the result.

pub(crate) mod items;
pub(crate) mod users;

mod policy;
mod storage;
mod types;

const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 100;
const ADDRESS_MAX: usize = 500;
const TITLE_MIN: usize = 2;
const TITLE_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

#[cfg(test)]
mod tests;
