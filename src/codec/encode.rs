//! Response encoding
//!
//! Builds the HTTP response for an [`Envelope`]: serialize, append exactly
//! one trailing newline, merge caller headers (caller wins on collision),
//! then force the JSON content type so no caller can override it. Headers,
//! status and body are assembled before anything is written to the wire, so
//! no caller logic can interleave with the write.

use axum::body::Body;
use axum::http::header::{HeaderMap, CONTENT_TYPE};
use axum::http::{HeaderValue, Response, StatusCode};
use thiserror::Error;

use super::envelope::Envelope;

/// Failure to turn an envelope into a response
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The envelope could not be serialized
    #[error("response could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The response could not be assembled
    #[error("response could not be built: {0}")]
    Build(#[from] axum::http::Error),
}

/// Serialize `envelope` into a JSON response with merged headers
pub fn write_json(
    status: StatusCode,
    envelope: &Envelope,
    headers: HeaderMap,
) -> Result<Response<Body>, EncodeError> {
    let mut body = serde_json::to_vec(envelope)?;
    body.push(b'\n');

    let mut response = Response::builder().status(status).body(Body::from(body))?;

    // Caller headers first, content type last: a caller-supplied value wins
    // over any default, but nothing overrides the content type.
    for (name, value) in headers.iter() {
        response.headers_mut().insert(name, value.clone());
    }
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::header::HeaderName;
    use serde_json::json;

    async fn body_bytes(response: Response<Body>) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_appends_exactly_one_newline() {
        let envelope = Envelope::new().with("status", json!("available"));
        let response = write_json(StatusCode::OK, &envelope, HeaderMap::new()).unwrap();

        let body = body_bytes(response).await;
        assert_eq!(body.last(), Some(&b'\n'));
        assert_ne!(body.get(body.len() - 2), Some(&b'\n'));

        // The body before the newline is one JSON object
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "available");
    }

    #[tokio::test]
    async fn test_content_type_cannot_be_overridden() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

        let envelope = Envelope::new().with("ok", json!(true));
        let response = write_json(StatusCode::OK, &envelope, headers).unwrap();

        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_caller_headers_are_merged() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("location"),
            HeaderValue::from_static("/v1/movies/1"),
        );

        let envelope = Envelope::new().with("movie", json!({"id": 1}));
        let response = write_json(StatusCode::CREATED, &envelope, headers).unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("location").unwrap(), "/v1/movies/1");
    }
}
