//! User model and store
//!
//! Registration-only surface: users are created with an Argon2id password
//! hash and a unique email address. Plaintext passwords never leave the
//! registration handler; the hash is never serialized into responses.

use std::collections::HashMap;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use crate::validator::{self, Validator};

/// A registered user
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub activated: bool,
    pub version: i32,
}

impl User {
    /// Build a not-yet-activated user, hashing the plaintext password
    pub fn new(name: String, email: String, password: &str) -> Result<Self, PasswordError> {
        Ok(Self {
            id: Uuid::nil(),
            created_at: Utc::now(),
            name,
            email,
            password_hash: hash_password(password)?,
            activated: false,
            version: 0,
        })
    }

    /// Check a plaintext password against the stored hash
    pub fn password_matches(&self, password: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(&self.password_hash).map_err(|_| PasswordError::Hashing)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Password hashing failure (never carries the plaintext)
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed")]
    Hashing,
}

fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::Hashing)
}

/// Field checks for a registration request
pub fn validate_user(v: &mut Validator, user: &User, password: &str) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(
        user.name.len() <= 500,
        "name",
        "must not be more than 500 bytes long",
    );

    v.check(!user.email.is_empty(), "email", "must be provided");
    v.check(
        validator::matches_email(&user.email),
        "email",
        "must be a valid email address",
    );

    v.check(!password.is_empty(), "password", "must be provided");
    v.check(
        password.len() >= 8,
        "password",
        "must be at least 8 bytes long",
    );
    v.check(
        password.len() <= 72,
        "password",
        "must not be more than 72 bytes long",
    );
}

/// User storage with a case-insensitive unique email constraint
#[derive(Default)]
pub struct UserStore {
    rows: RwLock<HashMap<Uuid, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new user at version 1.
    ///
    /// The email uniqueness check and the insert happen under one write
    /// guard, so two concurrent registrations of the same address cannot
    /// both succeed.
    pub async fn insert(&self, user: &mut User) -> StoreResult<()> {
        user.id = Uuid::new_v4();
        user.version = 1;
        let stored = user.clone();

        super::versioned::timed(async {
            let mut rows = self.rows.write().await;
            let email = stored.email.to_lowercase();
            if rows.values().any(|u| u.email.to_lowercase() == email) {
                return Err(StoreError::DuplicateEmail);
            }
            rows.insert(stored.id, stored);
            Ok(())
        })
        .await
    }

    /// Look up a user by email address
    pub async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        let email = email.to_lowercase();
        super::versioned::timed(async {
            self.rows
                .read()
                .await
                .values()
                .find(|u| u.email.to_lowercase() == email)
                .cloned()
                .ok_or(StoreError::NotFound)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> User {
        User::new(
            "Alice".to_string(),
            "alice@example.com".to_string(),
            "correct horse battery",
        )
        .unwrap()
    }

    #[test]
    fn test_password_is_hashed_and_verifiable() {
        let user = alice();
        assert_ne!(user.password_hash, "correct horse battery");
        assert!(user.password_hash.starts_with("$argon2"));
        assert!(user.password_matches("correct horse battery").unwrap());
        assert!(!user.password_matches("wrong").unwrap());
    }

    #[test]
    fn test_password_hash_never_serializes() {
        let out = serde_json::to_string(&alice()).unwrap();
        assert!(!out.contains("password_hash"));
        assert!(!out.contains("argon2"));
    }

    #[test]
    fn test_validate_user_field_errors() {
        let user = User::new("".to_string(), "not-an-email".to_string(), "pw").unwrap();
        let mut v = Validator::new();
        validate_user(&mut v, &user, "pw");
        let errors = v.into_errors();
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("email"));
        assert_eq!(errors.get("password").unwrap(), "must be at least 8 bytes long");
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_version_one() {
        let store = UserStore::new();
        let mut user = alice();
        store.insert(&mut user).await.unwrap();
        assert_ne!(user.id, Uuid::nil());
        assert_eq!(user.version, 1);

        let fetched = store.get_by_email("alice@example.com").await.unwrap();
        assert_eq!(fetched.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let store = UserStore::new();
        let mut first = alice();
        store.insert(&mut first).await.unwrap();

        let mut second =
            User::new("Other".to_string(), "ALICE@example.com".to_string(), "another password")
                .unwrap();
        assert_eq!(
            store.insert(&mut second).await.unwrap_err(),
            StoreError::DuplicateEmail
        );
    }

    #[tokio::test]
    async fn test_missing_email_reports_not_found() {
        let store = UserStore::new();
        assert_eq!(
            store.get_by_email("ghost@example.com").await.unwrap_err(),
            StoreError::NotFound
        );
    }
}
