use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatalogStore, FavoriteStore, ReviewStore, UserStore, WatchlistStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        CandidateQuery, Favorite, Movie, MovieFilter, MovieKey, NewReview, NewUser,
        ProfileUpdate, Review, ReviewUpdate, User, UserAccount, Watchlist, WatchlistMovie,
    },
};

/// Store kept entirely in process memory
///
/// Collections are plain vectors, so catalog iteration order is insertion
/// order. Used by the test suites and for running without PostgreSQL.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: Vec<UserAccount>,
    movies: Vec<Movie>,
    favorites: Vec<Favorite>,
    watchlists: Vec<Watchlist>,
    reviews: Vec<Review>,
    refresh_tokens: Vec<RefreshSession>,
}

struct RefreshSession {
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let account = UserAccount {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
        };
        inner.users.push(account.clone());
        Ok(account.into())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .map(User::from))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;

        let taken = inner.users.iter().any(|u| {
            u.id != user_id
                && (update.username.as_ref() == Some(&u.username)
                    || update.email.as_ref() == Some(&u.email))
        });
        if taken {
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let Some(account) = inner.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        if let Some(username) = update.username {
            account.username = username;
        }
        if let Some(email) = update.email {
            account.email = email;
        }
        Ok(Some(account.clone().into()))
    }

    async fn save_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.refresh_tokens.push(RefreshSession {
            token: token.to_string(),
            user_id,
            expires_at,
        });
        Ok(())
    }

    async fn user_for_refresh_token(&self, token: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        let now = Utc::now();

        let Some(session) = inner
            .refresh_tokens
            .iter()
            .find(|s| s.token == token && s.expires_at > now)
        else {
            return Ok(None);
        };

        Ok(inner
            .users
            .iter()
            .find(|u| u.id == session.user_id)
            .cloned()
            .map(User::from))
    }

    async fn revoke_refresh_token(&self, token: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.refresh_tokens.len();
        inner.refresh_tokens.retain(|s| s.token != token);
        Ok(inner.refresh_tokens.len() < before)
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn list(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect())
    }

    async fn insert(&self, movie: Movie) -> AppResult<Movie> {
        let mut inner = self.inner.write().await;
        if inner.movies.iter().any(|m| m.id == movie.id) {
            return Err(AppError::Conflict(format!(
                "Movie {} already exists",
                movie.id
            )));
        }
        inner.movies.push(movie.clone());
        Ok(movie)
    }

    async fn find_by_ids(&self, ids: &[MovieKey]) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect())
    }

    async fn find_candidates(&self, query: &CandidateQuery) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .filter(|m| query.matches(m))
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> AppResult<u64> {
        let inner = self.inner.read().await;
        Ok(inner.movies.len() as u64)
    }

    async fn window(&self, offset: u64, limit: u64) -> AppResult<Vec<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl FavoriteStore for MemoryStore {
    async fn add_favorite(&self, user_id: Uuid, movie: WatchlistMovie) -> AppResult<Favorite> {
        let favorite = Favorite {
            id: Uuid::new_v4(),
            user_id,
            movie_id: movie.movie_id,
            title: movie.title,
            poster_path: movie.poster_path,
            created_at: Utc::now(),
        };
        self.inner.write().await.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn favorites_for(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        let inner = self.inner.read().await;
        Ok(inner
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn remove_favorite(&self, user_id: Uuid, movie_id: &MovieKey) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.favorites.len();
        inner
            .favorites
            .retain(|f| !(f.user_id == user_id && &f.movie_id == movie_id));
        Ok((before - inner.favorites.len()) as u64)
    }
}

#[async_trait::async_trait]
impl WatchlistStore for MemoryStore {
    async fn create_watchlist(&self, user_id: Uuid, name: String) -> AppResult<Watchlist> {
        let watchlist = Watchlist {
            id: Uuid::new_v4(),
            user_id,
            name,
            movies: Vec::new(),
            created_at: Utc::now(),
        };
        self.inner.write().await.watchlists.push(watchlist.clone());
        Ok(watchlist)
    }

    async fn watchlists_for(&self, user_id: Uuid) -> AppResult<Vec<Watchlist>> {
        let inner = self.inner.read().await;
        Ok(inner
            .watchlists
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_to_watchlist(
        &self,
        user_id: Uuid,
        watchlist_id: Uuid,
        movie: WatchlistMovie,
    ) -> AppResult<Option<Watchlist>> {
        let mut inner = self.inner.write().await;
        let watchlist = inner
            .watchlists
            .iter_mut()
            .find(|w| w.id == watchlist_id && w.user_id == user_id);

        Ok(watchlist.map(|w| {
            w.movies.push(movie);
            w.clone()
        }))
    }
}

#[async_trait::async_trait]
impl ReviewStore for MemoryStore {
    async fn add_review(&self, user_id: Uuid, review: NewReview) -> AppResult<Review> {
        let review = Review {
            id: Uuid::new_v4(),
            user_id,
            movie_id: review.movie_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        self.inner.write().await.reviews.push(review.clone());
        Ok(review)
    }

    async fn reviews_for(&self, user_id: Uuid) -> AppResult<Vec<Review>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn reviews_for_movie(&self, movie_id: &MovieKey) -> AppResult<Vec<Review>> {
        let inner = self.inner.read().await;
        Ok(inner
            .reviews
            .iter()
            .filter(|r| &r.movie_id == movie_id)
            .cloned()
            .collect())
    }

    async fn find_review(&self, review_id: Uuid) -> AppResult<Option<Review>> {
        let inner = self.inner.read().await;
        Ok(inner.reviews.iter().find(|r| r.id == review_id).cloned())
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        update: ReviewUpdate,
    ) -> AppResult<Option<Review>> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .map(|r| {
                r.rating = update.rating;
                r.comment = update.comment;
                r.clone()
            }))
    }

    async fn delete_review(&self, review_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.reviews.len();
        inner.reviews.retain(|r| r.id != review_id);
        Ok(inner.reviews.len() < before)
    }
}
