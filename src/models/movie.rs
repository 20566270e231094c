use serde::{Deserialize, Serialize};

use super::MovieKey;
use crate::error::{AppError, AppResult};

/// A catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    #[sqlx(try_from = "String")]
    pub id: MovieKey,
    pub title: String,
    /// Single genre tag
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub description: Option<String>,
    pub poster_url: Option<String>,
}

/// Payload for adding a movie to the catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    #[serde(default)]
    pub id: Option<MovieKey>,
    pub title: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl NewMovie {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title is required".to_string()));
        }
        Ok(())
    }

    /// Builds the catalog entry, assigning a fresh id when none was given
    pub fn into_movie(self) -> Movie {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| MovieKey::new(uuid::Uuid::new_v4().to_string()));

        Movie {
            id,
            title: self.title,
            genre: self.genre,
            year: self.year,
            description: self.description,
            poster_url: self.poster_url,
        }
    }
}

/// Filters for listing the catalog
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieFilter {
    /// Case-insensitive title substring
    pub search: Option<String>,
    /// Exact genre
    pub genre: Option<String>,
}

impl MovieFilter {
    pub fn matches(&self, movie: &Movie) -> bool {
        let title_ok = match &self.search {
            Some(search) => movie
                .title
                .to_lowercase()
                .contains(&search.to_lowercase()),
            None => true,
        };
        let genre_ok = match &self.genre {
            Some(genre) => movie.genre.as_deref() == Some(genre.as_str()),
            None => true,
        };
        title_ok && genre_ok
    }
}

/// Genre-matched candidate lookup used by the recommender
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    /// Allowed genres; empty means any genre
    pub genres: Vec<String>,
    /// Ids that must not be returned
    pub exclude: Vec<MovieKey>,
    pub limit: usize,
}

impl CandidateQuery {
    pub fn matches(&self, movie: &Movie) -> bool {
        let genre_ok = self.genres.is_empty()
            || movie
                .genre
                .as_ref()
                .is_some_and(|genre| self.genres.contains(genre));
        genre_ok && !self.exclude.contains(&movie.id)
    }
}
