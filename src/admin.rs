// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Reserved admin identity.
//!
//! The admin username may only be used by someone who knows the admin
//! password. The password itself is never stored, only its hash, which may be
//! Argon2 (PHC string) or bcrypt.

use crate::config::ConfigError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::fmt;

const USERNAME_VAR: &str = "SERVER_USERNAME";
const PASSWORD_HASH_VAR: &str = "SERVER_PASSWORD_HASH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashScheme {
    Argon2,
    Bcrypt,
}

/// Admin username and password hash, loaded once at startup.
#[derive(Clone)]
pub struct AdminIdentity {
    username: String,
    password_hash: String,
    scheme: HashScheme,
}

impl AdminIdentity {
    /// Build an identity. The username is lowercased; the hash must parse.
    pub fn new(username: &str, password_hash: &str) -> Result<Self, ConfigError> {
        let username = username.trim().to_lowercase();
        if username.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: USERNAME_VAR,
                value: String::new(),
            });
        }

        let password_hash = password_hash.trim().to_string();
        let scheme = detect_scheme(&password_hash)?;

        Ok(Self {
            username,
            password_hash,
            scheme,
        })
    }

    /// Load from `SERVER_USERNAME` and `SERVER_PASSWORD_HASH`. Both are
    /// required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let username =
            std::env::var(USERNAME_VAR).map_err(|_| ConfigError::MissingVar(USERNAME_VAR))?;
        let password_hash = std::env::var(PASSWORD_HASH_VAR)
            .map_err(|_| ConfigError::MissingVar(PASSWORD_HASH_VAR))?;
        Self::new(&username, &password_hash)
    }

    /// The reserved username, lowercased.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether `candidate` is the reserved username, ignoring case.
    pub fn is_reserved(&self, candidate: &str) -> bool {
        candidate.to_lowercase() == self.username
    }

    /// Verify a password against the stored hash.
    pub fn verify_password(&self, password: &str) -> bool {
        match self.scheme {
            HashScheme::Argon2 => match PasswordHash::new(&self.password_hash) {
                Ok(parsed) => Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
                Err(_) => false,
            },
            HashScheme::Bcrypt => pwhash::bcrypt::verify(password, &self.password_hash),
        }
    }
}

impl fmt::Debug for AdminIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminIdentity")
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Hash a password with Argon2id and a random salt, for use as
/// `SERVER_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> Result<String, ConfigError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ConfigError::InvalidPasswordHash(e.to_string()))
}

fn detect_scheme(hash: &str) -> Result<HashScheme, ConfigError> {
    if hash.is_empty() {
        return Err(ConfigError::MissingVar(PASSWORD_HASH_VAR));
    }

    let is_bcrypt = ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
        && hash.len() == 60;
    if is_bcrypt {
        return Ok(HashScheme::Bcrypt);
    }

    match PasswordHash::new(hash) {
        Ok(parsed) if parsed.algorithm.as_str().starts_with("argon2") => Ok(HashScheme::Argon2),
        Ok(parsed) => Err(ConfigError::InvalidPasswordHash(format!(
            "unsupported algorithm {}",
            parsed.algorithm
        ))),
        Err(e) => Err(ConfigError::InvalidPasswordHash(e.to_string())),
    }
}
