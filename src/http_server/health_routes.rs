//! Healthcheck endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde_json::json;

use super::errors::ApiError;
use super::server::AppState;
use super::VERSION;
use crate::codec::{self, Envelope};

/// `GET /v1/healthcheck`
///
/// Reports `available` while running and `draining` once shutdown has begun,
/// so load balancers can stop routing to an instance that is on its way out.
pub async fn healthcheck_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let status = if state.lifecycle.is_draining() {
        "draining"
    } else {
        "available"
    };

    let envelope = Envelope::new().with("status", json!(status)).with(
        "system_info",
        json!({
            "environment": state.config.env,
            "version": VERSION,
        }),
    );

    codec::write_json(StatusCode::OK, &envelope, HeaderMap::new())
        .map_err(|e| ApiError::Internal(e.to_string()))
}
