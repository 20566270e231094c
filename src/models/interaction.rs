use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MovieKey;
use crate::error::{AppError, AppResult};

/// Highest accepted review rating
pub const MAX_RATING: i32 = 10;
/// Longest accepted review comment, in characters
pub const MAX_COMMENT_LEN: usize = 500;

/// A movie a user marked as favorite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub movie_id: MovieKey,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Movie reference embedded in favorites requests and watchlists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistMovie {
    #[sqlx(try_from = "String")]
    pub movie_id: MovieKey,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl WatchlistMovie {
    pub fn validate(&self) -> AppResult<()> {
        if self.movie_id.is_empty() {
            return Err(AppError::InvalidInput("movieId is required".to_string()));
        }
        Ok(())
    }
}

/// A named list of movies owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Watchlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub movies: Vec<WatchlistMovie>,
    pub created_at: DateTime<Utc>,
}

/// A user's rating of a movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub movie_id: MovieKey,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a review
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub movie_id: MovieKey,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewReview {
    pub fn validate(&self) -> AppResult<()> {
        if self.movie_id.is_empty() {
            return Err(AppError::InvalidInput("movieId is required".to_string()));
        }
        validate_rating(self.rating, self.comment.as_deref())
    }
}

/// Payload for editing a review
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewUpdate {
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

impl ReviewUpdate {
    pub fn validate(&self) -> AppResult<()> {
        validate_rating(self.rating, self.comment.as_deref())
    }
}

fn validate_rating(rating: i32, comment: Option<&str>) -> AppResult<()> {
    if !(1..=MAX_RATING).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between 1 and {}",
            MAX_RATING
        )));
    }
    if comment.is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN) {
        return Err(AppError::InvalidInput(format!(
            "Comment max length is {}",
            MAX_COMMENT_LEN
        )));
    }
    Ok(())
}
