//! API error responses
//!
//! Three classes of failure leave a handler: client-input errors (4xx, with
//! per-field detail), the optimistic-concurrency edit conflict (409, with a
//! retry hint), and infrastructure failures (opaque 500 -- full detail goes
//! to the log, never to the client).

use std::collections::BTreeMap;

use axum::http::header::HeaderMap;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::codec::{self, DecodeError, Envelope};
use crate::observability::Logger;
use crate::store::StoreError;

/// Errors a handler can answer with
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body failed to decode
    #[error("{0}")]
    BadRequest(#[from] DecodeError),

    /// Field-level validation failures
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),

    /// The requested resource does not exist
    #[error("the requested resource could not be found")]
    NotFound,

    /// The record changed under the caller; re-read and retry
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    /// Anything the client cannot fix; detail is logged, not returned
    #[error("the server encountered a problem and could not process your request")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::EditConflict => ApiError::EditConflict,
            // DuplicateEmail is normally intercepted by the registration
            // handler and folded into its validation map; reaching here
            // still answers with the right class.
            StoreError::DuplicateEmail => {
                let mut errors = BTreeMap::new();
                errors.insert(
                    "email".to_string(),
                    "a user with this email address already exists".to_string(),
                );
                ApiError::Validation(errors)
            }
            StoreError::Timeout(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            // Full detail stays server-side
            Logger::error("internal_error", &[("detail", detail)]);
        }

        let status = self.status_code();
        let envelope = match &self {
            ApiError::Validation(errors) => Envelope::new().with("error", json!(errors)),
            other => Envelope::new().with("error", json!(other.to_string())),
        };

        match codec::write_json(status, &envelope, HeaderMap::new()) {
            Ok(response) => response,
            // Serializing a string envelope cannot realistically fail, but
            // the client still deserves a status code if it does.
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
