//! # Validator
//!
//! Keyed validation error collection. Handlers run their checks against a
//! [`Validator`] and, if any fail, answer with the per-field error map in a
//! 422 response.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

/// Permissive email shape check (full RFC validation is not the goal here)
static EMAIL_RX: OnceLock<Regex> = OnceLock::new();

fn email_rx() -> &'static Regex {
    EMAIL_RX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
    })
}

/// Collects keyed validation failures
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` under `key` if `ok` is false. The first message for a
    /// key wins.
    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    /// Record a failure directly
    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> BTreeMap<String, String> {
        self.errors
    }
}

/// True if `value` looks like an email address
pub fn matches_email(value: &str) -> bool {
    email_rx().is_match(value)
}

/// True if `value` is one of `permitted`
pub fn permitted<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// True if all values in the slice are distinct
pub fn unique<T: PartialEq>(values: &[T]) -> bool {
    values
        .iter()
        .enumerate()
        .all(|(i, v)| !values[..i].contains(v))
}
