//! Movie model and store
//!
//! Movies are the shared mutable records of the catalog: concurrent editors
//! race on them, so every write goes through the optimistic update protocol
//! in [`VersionedTable`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

use super::errors::StoreResult;
use super::filters::{Filters, Metadata, SortField, SortKey};
use super::runtime::Runtime;
use super::versioned::{Versioned, VersionedTable};
use crate::validator::{self, Validator};

/// A catalog movie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    pub id: i64,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    pub version: i32,
}

impl Versioned for Movie {
    type Key = i64;

    fn key(&self) -> i64 {
        self.id
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }
}

/// Business-rule checks for a movie about to be written
pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= 500,
        "title",
        "must not be more than 500 bytes long",
    );

    match movie.year {
        None => v.add_error("year", "must be provided"),
        Some(year) => {
            v.check(year >= 1888, "year", "must be greater than 1888");
            v.check(
                year <= Utc::now().year(),
                "year",
                "must not be in the future",
            );
        }
    }

    match movie.runtime {
        None => v.add_error("runtime", "must be provided"),
        Some(runtime) => {
            v.check(runtime.minutes() > 0, "runtime", "must be a positive integer");
        }
    }

    v.check(!movie.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        movie.genres.len() <= 5,
        "genres",
        "must not contain more than 5 genres",
    );
    v.check(
        validator::unique(&movie.genres),
        "genres",
        "must not contain duplicate values",
    );
}

/// Movie storage with id allocation and listing
pub struct MovieStore {
    table: VersionedTable<Movie>,
    next_id: AtomicI64,
}

impl Default for MovieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MovieStore {
    pub fn new() -> Self {
        Self {
            table: VersionedTable::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Insert a new movie, assigning its id, creation time and version 1
    pub async fn insert(&self, movie: &mut Movie) -> StoreResult<()> {
        movie.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        movie.created_at = Utc::now();
        self.table.insert(movie).await
    }

    pub async fn get(&self, id: i64) -> StoreResult<Movie> {
        self.table.get(id).await
    }

    /// Version-checked update; see [`VersionedTable::update`]
    pub async fn update(&self, movie: &mut Movie) -> StoreResult<()> {
        self.table.update(movie).await
    }

    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        self.table.delete(id).await
    }

    /// List movies matching a title substring and a genre set, sorted and
    /// paginated.
    ///
    /// An empty `title` matches everything; `genres` requires every named
    /// genre to be present on the movie. The sort key has already been
    /// resolved against the safelist by the caller.
    pub async fn list(
        &self,
        title: &str,
        genres: &[String],
        sort: SortKey,
        filters: &Filters,
    ) -> StoreResult<(Vec<Movie>, Metadata)> {
        let mut matches: Vec<Movie> = self
            .table
            .snapshot()
            .await?
            .into_iter()
            .filter(|movie| {
                let title_ok = title.is_empty()
                    || movie.title.to_lowercase().contains(&title.to_lowercase());
                let genres_ok = genres.iter().all(|g| movie.genres.contains(g));
                title_ok && genres_ok
            })
            .collect();

        matches.sort_by(|a, b| {
            let ordering = match sort.field {
                SortField::Id => a.id.cmp(&b.id),
                SortField::Title => a.title.cmp(&b.title),
                SortField::Year => a.year.cmp(&b.year),
                SortField::Runtime => a.runtime.cmp(&b.runtime),
            };
            let ordering = if sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            // Ties resolve by ascending id so pages are stable
            ordering.then(a.id.cmp(&b.id))
        });

        let total = matches.len() as i64;
        let metadata = Metadata::calculate(total, filters.page, filters.page_size);
        let page: Vec<Movie> = matches
            .into_iter()
            .skip(filters.offset())
            .take(filters.limit())
            .collect();

        Ok((page, metadata))
    }
}
