//! Listing filters: pagination, sorting, metadata
//!
//! The sort key comes from an untrusted query parameter. An unrecognized key
//! is a client-input error resolved *before* any listing work begins; it is
//! never a process abort.

use serde::Serialize;
use thiserror::Error;

use crate::validator::Validator;

/// Filter problems caused by the client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Sort key not on the safelist
    #[error("invalid sort value \"{0}\"")]
    UnsafeSortKey(String),
}

/// Sortable movie fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Title,
    Year,
    Runtime,
}

/// Resolved sort instruction: field plus direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

/// Pagination and sorting parameters from the query string
#[derive(Debug, Clone)]
pub struct Filters {
    pub page: i64,
    pub page_size: i64,
    /// Raw sort value, optionally prefixed with `-` for descending
    pub sort: String,
    /// Permitted sort values, including their `-` forms
    pub sort_safelist: &'static [&'static str],
}

impl Filters {
    /// Resolve the client's sort value against the safelist.
    ///
    /// Anything not on the safelist is rejected here, before any query is
    /// constructed from it.
    pub fn sort_key(&self) -> Result<SortKey, FilterError> {
        if !self.sort_safelist.contains(&self.sort.as_str()) {
            return Err(FilterError::UnsafeSortKey(self.sort.clone()));
        }

        let descending = self.sort.starts_with('-');
        let name = self.sort.trim_start_matches('-');

        let field = match name {
            "id" => SortField::Id,
            "title" => SortField::Title,
            "year" => SortField::Year,
            "runtime" => SortField::Runtime,
            other => return Err(FilterError::UnsafeSortKey(other.to_string())),
        };

        Ok(SortKey { field, descending })
    }

    pub fn limit(&self) -> usize {
        self.page_size as usize
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.page_size) as usize
    }

    /// Range checks shared by every listing endpoint
    pub fn validate(&self, v: &mut Validator) {
        v.check(self.page > 0, "page", "must be greater than zero");
        v.check(self.page <= 10_000_000, "page", "must be a maximum of 10 million");
        v.check(self.page_size > 0, "page_size", "must be greater than zero");
        v.check(self.page_size <= 100, "page_size", "must be a maximum of 100");
        v.check(
            self.sort_safelist.contains(&self.sort.as_str()),
            "sort",
            "invalid sort value",
        );
    }
}

/// Pagination metadata included alongside every listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl Metadata {
    /// Derive metadata from the total record count and the client's paging
    pub fn calculate(total_records: i64, page: i64, page_size: i64) -> Self {
        if total_records == 0 {
            // An empty result set carries empty metadata
            return Self::default();
        }

        Self {
            current_page: page,
            page_size,
            first_page: 1,
            last_page: (total_records + page_size - 1) / page_size,
            total_records,
        }
    }
}
