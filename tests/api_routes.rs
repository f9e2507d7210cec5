//! End-to-end handler tests driving the router directly

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use reelbase::http_server::{api_router, recover_panics, AppState, ServerConfig, ShutdownCoordinator};
use reelbase::mailer::{Mailer, MockMailer};
use reelbase::observability::{CapturingDiagnostics, Diagnostics};
use reelbase::store::{MovieStore, UserStore};
use reelbase::tasks::TaskTracker;

struct TestApp {
    state: Arc<AppState>,
    mailer: Arc<Mailer>,
}

fn test_app() -> TestApp {
    let diagnostics: Arc<dyn Diagnostics> = Arc::new(CapturingDiagnostics::new());
    let mailer = Arc::new(Mailer::Mock(MockMailer::new()));
    let coordinator = ShutdownCoordinator::new();

    let state = Arc::new(AppState {
        config: ServerConfig::default(),
        movies: MovieStore::new(),
        users: UserStore::new(),
        tasks: TaskTracker::new(diagnostics.clone()),
        mailer: mailer.clone(),
        diagnostics,
        lifecycle: coordinator.handle(),
    });

    TestApp { state, mailer }
}

impl TestApp {
    async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request_with_headers(method, uri, body, &[]).await
    }

    async fn request_with_headers(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(match body {
                Some(value) => Body::from(value.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = api_router(self.state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn moana() -> Value {
    json!({
        "title": "Moana",
        "year": 2016,
        "runtime": "107 mins",
        "genres": ["animation", "adventure"]
    })
}

#[tokio::test]
async fn test_healthcheck_reports_available() {
    let app = test_app();
    let (status, body) = app.request("GET", "/v1/healthcheck", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
    assert_eq!(body["system_info"]["environment"], "development");
    assert_eq!(body["system_info"]["version"], "1.0.0");
}

#[tokio::test]
async fn test_create_and_fetch_movie() {
    let app = test_app();

    let (status, body) = app.request("POST", "/v1/movies", Some(moana())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["movie"]["title"], "Moana");
    assert_eq!(body["movie"]["runtime"], "107 mins");
    assert_eq!(body["movie"]["version"], 1);

    let id = body["movie"]["id"].as_i64().unwrap();
    let (status, body) = app
        .request("GET", &format!("/v1/movies/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movie"]["id"], id);
}

#[tokio::test]
async fn test_unknown_body_field_is_a_400() {
    let app = test_app();
    let mut body = moana();
    body["rating"] = json!("PG");

    let (status, response) = app.request("POST", "/v1/movies", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "body contains unknown key \"rating\"");
}

#[tokio::test]
async fn test_empty_body_is_a_400() {
    let app = test_app();
    let (status, response) = app.request("POST", "/v1/movies", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "body must not be empty");
}

#[tokio::test]
async fn test_oversized_body_gets_the_codec_error_not_a_bare_413() {
    let app = test_app();
    let mut body = moana();
    // 3 MiB of title against the 1 MiB body limit
    body["title"] = json!("x".repeat(3 * 1024 * 1024));

    let (status, response) = app.request("POST", "/v1/movies", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"],
        "body must not be larger than 1048576 bytes"
    );
}

#[tokio::test]
async fn test_validation_failures_are_per_field_422() {
    let app = test_app();
    let body = json!({
        "title": "",
        "year": 1600,
        "runtime": "10 mins",
        "genres": []
    });

    let (status, response) = app.request("POST", "/v1/movies", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["error"]["title"], "must be provided");
    assert_eq!(response["error"]["year"], "must be greater than 1888");
    assert_eq!(response["error"]["genres"], "must contain at least 1 genre");
}

#[tokio::test]
async fn test_fetching_missing_movie_is_a_404() {
    let app = test_app();
    let (status, _) = app.request("GET", "/v1/movies/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Garbage ids read as "no such resource" too
    let (status, _) = app.request("GET", "/v1/movies/abc", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_bumps_version() {
    let app = test_app();
    let (_, body) = app.request("POST", "/v1/movies", Some(moana())).await;
    let id = body["movie"]["id"].as_i64().unwrap();

    let patch = json!({"title": "Moana 2"});
    let (status, body) = app
        .request("PATCH", &format!("/v1/movies/{}", id), Some(patch))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["movie"]["title"], "Moana 2");
    assert_eq!(body["movie"]["version"], 2);
}

#[tokio::test]
async fn test_stale_expected_version_is_a_409() {
    let app = test_app();
    let (_, body) = app.request("POST", "/v1/movies", Some(moana())).await;
    let id = body["movie"]["id"].as_i64().unwrap();
    let uri = format!("/v1/movies/{}", id);

    // First writer moves the record to version 2
    let (status, _) = app
        .request("PATCH", &uri, Some(json!({"year": 2017})))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Second writer still holds version 1 and asks for it explicitly
    let (status, response) = app
        .request_with_headers(
            "PATCH",
            &uri,
            Some(json!({"year": 2018})),
            &[("x-expected-version", "1")],
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(response["error"].as_str().unwrap().contains("try again"));

    // The losing write left nothing behind
    let (_, body) = app.request("GET", &uri, None).await;
    assert_eq!(body["movie"]["year"], 2017);
    assert_eq!(body["movie"]["version"], 2);
}

#[tokio::test]
async fn test_delete_then_delete_again() {
    let app = test_app();
    let (_, body) = app.request("POST", "/v1/movies", Some(moana())).await;
    let id = body["movie"]["id"].as_i64().unwrap();
    let uri = format!("/v1/movies/{}", id);

    let (status, body) = app.request("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "movie successfully deleted");

    // "already gone" is distinguishable from "deleted"
    let (status, _) = app.request("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_movies_filters_and_paginates() {
    let app = test_app();
    for (title, year) in [("Casablanca", 1942), ("Black Panther", 2018), ("Deadpool", 2016)] {
        let movie = json!({
            "title": title,
            "year": year,
            "runtime": "100 mins",
            "genres": ["drama"]
        });
        app.request("POST", "/v1/movies", Some(movie)).await;
    }

    let (status, body) = app
        .request("GET", "/v1/movies?sort=-year&page_size=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = body["movies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["Black Panther", "Deadpool"]);
    assert_eq!(body["metadata"]["total_records"], 3);
    assert_eq!(body["metadata"]["last_page"], 2);
}

#[tokio::test]
async fn test_unsafe_sort_key_is_rejected_before_querying() {
    let app = test_app();
    let (status, body) = app
        .request("GET", "/v1/movies?sort=version;drop", None)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["sort"], "invalid sort value");
}

#[tokio::test]
async fn test_register_user_queues_welcome_email() {
    let app = test_app();
    let body = json!({
        "name": "Alice",
        "email": "alice@example.com",
        "password": "correct horse battery"
    });

    let (status, response) = app.request("POST", "/v1/users", Some(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(response["user"]["name"], "Alice");
    assert!(response["user"].get("password_hash").is_none());
    assert_eq!(response["user"]["activated"], false);

    // The email is sent off the request path; wait for the tracker to drain
    app.state.tasks.wait().await;
    match app.mailer.as_ref() {
        Mailer::Mock(mock) => {
            assert_eq!(mock.sent_count(), 1);
            assert!(mock.sent_to("alice@example.com"));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_duplicate_registration_is_a_validation_error() {
    let app = test_app();
    let body = json!({
        "name": "Alice",
        "email": "alice@example.com",
        "password": "correct horse battery"
    });

    let (status, _) = app.request("POST", "/v1/users", Some(body.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, response) = app.request("POST", "/v1/users", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response["error"]["email"],
        "a user with this email address already exists"
    );

    app.state.tasks.wait().await;
}

async fn exploding_handler() -> &'static str {
    panic!("lock poisoned in table 7");
}

#[tokio::test]
async fn test_handler_panic_answers_the_opaque_500_envelope() {
    let app = recover_panics(Router::new().route("/boom", get(exploding_handler)));

    let request = Request::builder()
        .method("GET")
        .uri("/boom")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body["error"],
        "the server encountered a problem and could not process your request"
    );
    // The panic detail stays server-side
    assert!(!body["error"].as_str().unwrap().contains("table 7"));
}

#[tokio::test]
async fn test_responses_carry_json_content_type_and_trailing_newline() {
    let app = test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/v1/healthcheck")
        .body(Body::empty())
        .unwrap();
    let response = api_router(app.state.clone()).oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.last(), Some(&b'\n'));
}
