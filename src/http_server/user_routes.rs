//! User registration endpoint
//!
//! Registration answers 202 as soon as the record is stored; the welcome
//! email goes through the background task tracker so SMTP latency and SMTP
//! failures never touch the response. The task is registered before the
//! response is written, so a shutdown arriving right after still waits for
//! the send.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Deserialize;

use super::errors::ApiError;
use super::server::AppState;
use crate::codec::{self, Envelope};
use crate::mailer::welcome_email;
use crate::store::user::validate_user;
use crate::store::{StoreError, User};
use crate::validator::Validator;

/// Request shape for `POST /v1/users`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// `POST /v1/users`
pub async fn register_user_handler(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let input: RegisterUserInput = codec::decode(&body)?;

    let name = input.name.unwrap_or_default();
    let email = input.email.unwrap_or_default();
    let password = input.password.unwrap_or_default();

    let mut user = User::new(name, email, &password)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut v = Validator::new();
    validate_user(&mut v, &user, &password);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    match state.users.insert(&mut user).await {
        Ok(()) => {}
        Err(StoreError::DuplicateEmail) => {
            v.add_error("email", "a user with this email address already exists");
            return Err(ApiError::Validation(v.into_errors()));
        }
        Err(err) => return Err(err.into()),
    }

    // Fire-and-forget: by the time this runs the client has usually already
    // received its 202, so failures are only reported out-of-band.
    {
        let mailer = state.mailer.clone();
        let diagnostics = state.diagnostics.clone();
        let email = welcome_email(&user.email, &user.name);
        state.tasks.spawn("welcome_email", async move {
            if let Err(err) = mailer.send(email).await {
                let cause = err.to_string();
                diagnostics.error("welcome_email_failed", &[("cause", cause.as_str())]);
            }
        });
    }

    let envelope = Envelope::new()
        .try_with("user", &user)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    codec::write_json(StatusCode::ACCEPTED, &envelope, HeaderMap::new())
        .map_err(|e| ApiError::Internal(e.to_string()))
}
