//! Movie metadata provider abstraction
//!
//! The search and details endpoints forward to an external metadata service
//! and hand its JSON back unchanged. Providers sit behind a trait so routes
//! can be tested without the network.
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Query-string parameters accepted by the search endpoint
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchParams {
    pub query: Option<String>,
    pub year: Option<String>,
    /// Genre id, forwarded as `with_genres`
    pub genre: Option<String>,
    pub sort_by: Option<String>,
}

impl SearchParams {
    pub fn validate(&self) -> AppResult<()> {
        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => Ok(()),
            _ => Err(AppError::InvalidInput("Search query cannot be empty".to_string())),
        }
    }

    /// Upstream query pairs, skipping unset parameters
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("query", &self.query),
            ("year", &self.year),
            ("with_genres", &self.genre),
            ("sort_by", &self.sort_by),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v.trim().to_string())))
        .collect()
    }

    /// Stable text form used as cache key
    pub fn cache_fragment(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// External movie metadata source
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Free-text movie search, upstream JSON verbatim
    async fn search_movies(&self, params: &SearchParams) -> AppResult<Value>;

    /// Full record for one movie including credits and videos
    async fn movie_details(&self, movie_id: &str) -> AppResult<Value>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
