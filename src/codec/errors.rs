//! Decode failure taxonomy
//!
//! Every failed decode maps to exactly one variant. Callers and handlers
//! switch on the variant, never on message text; the messages below are the
//! client-facing wording only.

use thiserror::Error;

/// Classified failure of a request-body decode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Structurally malformed JSON, with the byte offset of the first
    /// malformed token
    #[error("body contains badly-formed JSON (at byte {offset})")]
    Syntax { offset: usize },

    /// Body ended in the middle of a JSON value
    #[error("body contains badly-formed JSON")]
    UnexpectedEof,

    /// A value's type does not match the destination field
    #[error("{}", type_mismatch_message(.field, .offset))]
    TypeMismatch {
        /// Dotted path to the offending field, when resolvable
        field: Option<String>,
        offset: usize,
    },

    /// Body was empty (distinct from truncated JSON)
    #[error("body must not be empty")]
    EmptyBody,

    /// A field in the input does not map to the destination shape
    #[error("body contains unknown key \"{0}\"")]
    UnknownField(String),

    /// Body exceeds the configured size limit
    #[error("body must not be larger than {limit} bytes")]
    TooLarge { limit: usize },

    /// More data after the first complete JSON value
    #[error("body must only contain a single JSON value")]
    TrailingData,

    /// Anything the taxonomy does not cover (I/O level failures)
    #[error("body could not be decoded: {0}")]
    Other(String),
}

fn type_mismatch_message(field: &Option<String>, offset: &usize) -> String {
    match field {
        Some(name) => format!("body contains incorrect JSON type for field \"{}\"", name),
        None => format!("body contains incorrect JSON type (at byte {})", offset),
    }
}
