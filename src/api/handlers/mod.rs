//! API handlers and shared utilities for katalogo.
//!
//! This module organizes the service's route handlers and provides common
//! functions for payload validation.

pub mod catalog;
pub mod health;
pub mod root;

use regex::Regex;

/// Lightweight email sanity check used before persisting user data.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
