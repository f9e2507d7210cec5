//! Movie endpoints
//!
//! CRUD plus listing. Updates go through the optimistic-concurrency
//! protocol: the stored version is compared at write time and a mismatch
//! answers 409 so the client can re-read and retry. A client that wants a
//! hard precondition can send `X-Expected-Version` and get the conflict
//! before any fields are applied.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{HeaderMap, LOCATION};
use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::errors::ApiError;
use super::server::AppState;
use crate::codec::{self, Envelope};
use crate::store::movie::validate_movie;
use crate::store::{Filters, Movie, Runtime};
use crate::validator::Validator;

const MOVIE_SORT_SAFELIST: &[&str] = &[
    "id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime",
];

/// Request shape for `POST /v1/movies`. Unknown keys are decode errors, not
/// silently dropped.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMovieInput {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

/// Request shape for `PATCH /v1/movies/:id`; absent fields keep their value
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMovieInput {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

/// Parse the `:id` URL parameter; anything that is not a positive integer
/// reads as "no such resource"
fn read_id_param(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

fn encode(
    status: StatusCode,
    envelope: &Envelope,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    codec::write_json(status, envelope, headers).map_err(|e| ApiError::Internal(e.to_string()))
}

/// `POST /v1/movies`
pub async fn create_movie_handler(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let input: CreateMovieInput = codec::decode(&body)?;

    let mut movie = Movie {
        id: 0,
        created_at: Utc::now(),
        title: input.title.unwrap_or_default(),
        year: input.year,
        runtime: input.runtime,
        genres: input.genres.unwrap_or_default(),
        version: 0,
    };

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    state.movies.insert(&mut movie).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/v1/movies/{}", movie.id).parse() {
        headers.insert(LOCATION, location);
    }

    let envelope = Envelope::new()
        .try_with("movie", &movie)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    encode(StatusCode::CREATED, &envelope, headers)
}

/// `GET /v1/movies/:id`
pub async fn show_movie_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = read_id_param(&id)?;
    let movie = state.movies.get(id).await?;

    let envelope = Envelope::new()
        .try_with("movie", &movie)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    encode(StatusCode::OK, &envelope, HeaderMap::new())
}

/// `PATCH /v1/movies/:id`
pub async fn update_movie_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Response, ApiError> {
    let id = read_id_param(&id)?;
    let mut movie = state.movies.get(id).await?;

    // Optional precondition: a client holding a copy can refuse to apply its
    // edit to a record that moved on since.
    if let Some(expected) = headers.get("x-expected-version") {
        let matches = expected
            .to_str()
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .is_some_and(|v| v == movie.version);
        if !matches {
            return Err(ApiError::EditConflict);
        }
    }

    let input: UpdateMovieInput = codec::decode(&body)?;

    if let Some(title) = input.title {
        movie.title = title;
    }
    if let Some(year) = input.year {
        movie.year = Some(year);
    }
    if let Some(runtime) = input.runtime {
        movie.runtime = Some(runtime);
    }
    if let Some(genres) = input.genres {
        movie.genres = genres;
    }

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    // The version travelling in `movie` is the one read above; the store
    // rejects the write if another writer got there in between.
    state.movies.update(&mut movie).await?;

    let envelope = Envelope::new()
        .try_with("movie", &movie)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    encode(StatusCode::OK, &envelope, HeaderMap::new())
}

/// `DELETE /v1/movies/:id`
pub async fn delete_movie_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = read_id_param(&id)?;
    state.movies.delete(id).await?;

    let envelope = Envelope::new().with("message", json!("movie successfully deleted"));
    encode(StatusCode::OK, &envelope, HeaderMap::new())
}

/// `GET /v1/movies?title=&genres=&page=&page_size=&sort=`
pub async fn list_movies_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();

    let title = params.get("title").cloned().unwrap_or_default();
    let genres: Vec<String> = params
        .get("genres")
        .map(|raw| raw.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let filters = Filters {
        page: read_int(&params, "page", 1, &mut v),
        page_size: read_int(&params, "page_size", 20, &mut v),
        sort: params.get("sort").cloned().unwrap_or_else(|| "id".to_string()),
        sort_safelist: MOVIE_SORT_SAFELIST,
    };

    filters.validate(&mut v);
    if !v.is_valid() {
        return Err(ApiError::Validation(v.into_errors()));
    }

    // Safelisted above; resolving can no longer fail, but an unrecognized
    // key must never be anything worse than a client error.
    let sort = filters.sort_key().map_err(|_| {
        let mut errors = std::collections::BTreeMap::new();
        errors.insert("sort".to_string(), "invalid sort value".to_string());
        ApiError::Validation(errors)
    })?;

    let (movies, metadata) = state.movies.list(&title, &genres, sort, &filters).await?;

    let envelope = Envelope::new()
        .try_with("movies", &movies)
        .and_then(|e| e.try_with("metadata", &metadata))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    encode(StatusCode::OK, &envelope, HeaderMap::new())
}

/// Read an integer query parameter, recording a validation error on garbage
fn read_int(params: &HashMap<String, String>, key: &str, fallback: i64, v: &mut Validator) -> i64 {
    match params.get(key) {
        None => fallback,
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                v.add_error(key, "must be an integer value");
                fallback
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_id_param() {
        assert_eq!(read_id_param("42").unwrap(), 42);
        assert!(matches!(read_id_param("0"), Err(ApiError::NotFound)));
        assert!(matches!(read_id_param("-3"), Err(ApiError::NotFound)));
        assert!(matches!(read_id_param("abc"), Err(ApiError::NotFound)));
    }

    #[test]
    fn test_read_int_records_validation_error() {
        let mut params = HashMap::new();
        params.insert("page".to_string(), "seven".to_string());

        let mut v = Validator::new();
        let page = read_int(&params, "page", 1, &mut v);
        assert_eq!(page, 1);
        assert!(!v.is_valid());

        let mut v = Validator::new();
        assert_eq!(read_int(&params, "page_size", 20, &mut v), 20);
        assert!(v.is_valid());
    }
}
