// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Comment field validator.
//!
//! Runs on already sanitized text. Lengths are counted in `char`s.

use thiserror::Error;
use tracing::debug;

/// Shortest accepted comment body.
pub const MIN_CONTENT_CHARS: usize = 1;
/// Longest accepted comment body.
pub const MAX_CONTENT_CHARS: usize = 100;
/// Shortest accepted username.
pub const MIN_USERNAME_CHARS: usize = 1;
/// Longest accepted username.
pub const MAX_USERNAME_CHARS: usize = 25;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("comment must be between 1 and 100 characters!")]
    ContentLength,

    #[error("username must be between 1 and 25 characters!")]
    UsernameLength,
}

/// Check the comment body length.
pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    let len = content.chars().count();
    if (MIN_CONTENT_CHARS..=MAX_CONTENT_CHARS).contains(&len) {
        Ok(())
    } else {
        debug!(len, "Content length out of bounds");
        Err(ValidationError::ContentLength)
    }
}

/// Check the username length.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if (MIN_USERNAME_CHARS..=MAX_USERNAME_CHARS).contains(&len) {
        Ok(())
    } else {
        debug!(len, "Username length out of bounds");
        Err(ValidationError::UsernameLength)
    }
}
