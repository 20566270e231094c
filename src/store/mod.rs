//! Data store abstraction
//!
//! Each collection the service reads or writes sits behind its own trait, so
//! handlers and the recommender only see the operations they need. A single
//! backend type implements every trait; [`Stores`] hands out the shared
//! handles.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        CandidateQuery, Favorite, Movie, MovieFilter, MovieKey, NewReview, NewUser,
        ProfileUpdate, Review, ReviewUpdate, User, UserAccount, Watchlist, WatchlistMovie,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// User accounts
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts an account; `Conflict` when username or email is taken
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;

    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Applies the given fields; `None` when the user does not exist
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate)
        -> AppResult<Option<User>>;

    async fn save_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Owner of an unexpired refresh token
    async fn user_for_refresh_token(&self, token: &str) -> AppResult<Option<User>>;

    /// Deletes the token, reporting whether it existed
    async fn revoke_refresh_token(&self, token: &str) -> AppResult<bool>;
}

/// The movie catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Lists movies in catalog order
    async fn list(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>>;

    /// Adds a movie; `Conflict` when the id already exists
    async fn insert(&self, movie: Movie) -> AppResult<Movie>;

    /// Movies whose id is in `ids`
    async fn find_by_ids(&self, ids: &[MovieKey]) -> AppResult<Vec<Movie>>;

    /// Movies matching the query, catalog order, at most `query.limit`
    async fn find_candidates(&self, query: &CandidateQuery) -> AppResult<Vec<Movie>>;

    async fn count(&self) -> AppResult<u64>;

    /// Up to `limit` consecutive movies starting at `offset`, unfiltered
    async fn window(&self, offset: u64, limit: u64) -> AppResult<Vec<Movie>>;
}

/// Favorites
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn add_favorite(&self, user_id: Uuid, movie: WatchlistMovie) -> AppResult<Favorite>;

    async fn favorites_for(&self, user_id: Uuid) -> AppResult<Vec<Favorite>>;

    /// Removes the user's favorites for a movie, returning how many went away
    async fn remove_favorite(&self, user_id: Uuid, movie_id: &MovieKey) -> AppResult<u64>;
}

/// Watchlists and their embedded movies
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn create_watchlist(&self, user_id: Uuid, name: String) -> AppResult<Watchlist>;

    async fn watchlists_for(&self, user_id: Uuid) -> AppResult<Vec<Watchlist>>;

    /// Appends a movie to one of the user's watchlists; `None` if the
    /// watchlist does not exist or belongs to someone else
    async fn add_to_watchlist(
        &self,
        user_id: Uuid,
        watchlist_id: Uuid,
        movie: WatchlistMovie,
    ) -> AppResult<Option<Watchlist>>;
}

/// Reviews
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReviewStore: Send + Sync {
    async fn add_review(&self, user_id: Uuid, review: NewReview) -> AppResult<Review>;

    async fn reviews_for(&self, user_id: Uuid) -> AppResult<Vec<Review>>;

    async fn reviews_for_movie(&self, movie_id: &MovieKey) -> AppResult<Vec<Review>>;

    async fn find_review(&self, review_id: Uuid) -> AppResult<Option<Review>>;

    async fn update_review(
        &self,
        review_id: Uuid,
        update: ReviewUpdate,
    ) -> AppResult<Option<Review>>;

    /// Returns whether a review was deleted
    async fn delete_review(&self, review_id: Uuid) -> AppResult<bool>;
}

/// Shared handles to every store
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub favorites: Arc<dyn FavoriteStore>,
    pub watchlists: Arc<dyn WatchlistStore>,
    pub reviews: Arc<dyn ReviewStore>,
}

impl Stores {
    /// Stores backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_backend(Arc::new(PgStore::new(pool)))
    }

    /// Stores kept in process memory
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }

    /// Uses one backend for every collection
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserStore + CatalogStore + FavoriteStore + WatchlistStore + ReviewStore + 'static,
    {
        Self {
            users: backend.clone(),
            catalog: backend.clone(),
            favorites: backend.clone(),
            watchlists: backend.clone(),
            reviews: backend,
        }
    }
}
