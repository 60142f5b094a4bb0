//! Search facade types

pub mod service;

pub use service::SearchService;

use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

/// Hard ceiling on results per query
pub const MAX_LIMIT: usize = 100;

/// Longest accepted query, in characters
pub const MAX_QUERY_CHARS: usize = 1000;

/// A tenant's search request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub score_threshold: f32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: 10,
            score_threshold: 0.7,
        }
    }
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub const fn with_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    /// Validate the request bounds
    ///
    /// # Errors
    ///
    /// Returns `SearchError::InvalidRequest` when the query is empty or
    /// too long, the limit is outside `1..=100`, or the threshold is
    /// outside `[0, 1]`.
    pub fn validate(&self) -> SearchResult<()> {
        if self.query.trim().is_empty() {
            return Err(SearchError::InvalidRequest("query must not be empty".into()));
        }
        if self.query.chars().count() > MAX_QUERY_CHARS {
            return Err(SearchError::InvalidRequest(format!(
                "query exceeds {MAX_QUERY_CHARS} characters"
            )));
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(SearchError::InvalidRequest(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(SearchError::InvalidRequest(
                "score_threshold must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}
