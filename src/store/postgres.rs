use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{CatalogStore, FavoriteStore, ReviewStore, UserStore, WatchlistStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        CandidateQuery, Favorite, Movie, MovieFilter, MovieKey, NewReview, NewUser,
        ProfileUpdate, Review, ReviewUpdate, User, UserAccount, Watchlist, WatchlistMovie,
    },
};

const MOVIE_COLUMNS: &str = "id, title, genre, year, description, poster_url";
const REVIEW_COLUMNS: &str = "id, user_id, movie_id, rating, comment, created_at";
const FAVORITE_COLUMNS: &str = "id, user_id, movie_id, title, poster_path, created_at";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads watchlist rows and attaches their movies in insertion order
    async fn hydrate_watchlists(&self, rows: Vec<WatchlistRow>) -> AppResult<Vec<Watchlist>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let movie_rows = sqlx::query_as::<_, WatchlistMovieRow>(
            r#"
            SELECT watchlist_id, movie_id, title, poster_path
            FROM watchlist_movies
            WHERE watchlist_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut movies_by_list: HashMap<Uuid, Vec<WatchlistMovie>> = HashMap::new();
        for row in movie_rows {
            movies_by_list
                .entry(row.watchlist_id)
                .or_default()
                .push(WatchlistMovie {
                    movie_id: MovieKey::new(row.movie_id),
                    title: row.title,
                    poster_path: row.poster_path,
                });
        }

        Ok(rows
            .into_iter()
            .map(|row| Watchlist {
                movies: movies_by_list.remove(&row.id).unwrap_or_default(),
                id: row.id,
                user_id: row.user_id,
                name: row.name,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[derive(sqlx::FromRow)]
struct WatchlistRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct WatchlistMovieRow {
    watchlist_id: Uuid,
    movie_id: String,
    title: Option<String>,
    poster_path: Option<String>,
}

fn key_strings(keys: &[MovieKey]) -> Vec<String> {
    keys.iter().map(|key| key.as_str().to_string()).collect()
}

fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e),
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Username or email already exists"))?;

        Ok(account.into())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT id, username, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let account = sqlx::query_as::<_, UserAccount>(
            "SELECT id, username, email, password_hash FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account.map(User::from))
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> AppResult<Option<User>> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email)
            WHERE id = $1
            RETURNING id, username, email, password_hash
            "#,
        )
        .bind(user_id)
        .bind(update.username)
        .bind(update.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Username or email already exists"))?;

        Ok(account.map(User::from))
    }

    async fn save_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("INSERT INTO refresh_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(token)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn user_for_refresh_token(&self, token: &str) -> AppResult<Option<User>> {
        let account = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash
            FROM refresh_tokens t
            JOIN users u ON u.id = t.user_id
            WHERE t.token = $1 AND t.expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account.map(User::from))
    }

    async fn revoke_refresh_token(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn list(&self, filter: &MovieFilter) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            r#"
            SELECT {MOVIE_COLUMNS}
            FROM movies
            WHERE ($1::text IS NULL OR position(lower($1) IN lower(title)) > 0)
              AND ($2::text IS NULL OR genre = $2)
            ORDER BY seq
            "#
        ))
        .bind(filter.search.as_deref())
        .bind(filter.genre.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    async fn insert(&self, movie: Movie) -> AppResult<Movie> {
        let inserted = sqlx::query_as::<_, Movie>(&format!(
            r#"
            INSERT INTO movies (id, title, genre, year, description, poster_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            RETURNING {MOVIE_COLUMNS}
            "#
        ))
        .bind(movie.id.as_str())
        .bind(&movie.title)
        .bind(&movie.genre)
        .bind(movie.year)
        .bind(&movie.description)
        .bind(&movie.poster_url)
        .fetch_optional(&self.pool)
        .await?;

        inserted.ok_or_else(|| AppError::Conflict(format!("Movie {} already exists", movie.id)))
    }

    async fn find_by_ids(&self, ids: &[MovieKey]) -> AppResult<Vec<Movie>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = ANY($1) ORDER BY seq"
        ))
        .bind(key_strings(ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    async fn find_candidates(&self, query: &CandidateQuery) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            r#"
            SELECT {MOVIE_COLUMNS}
            FROM movies
            WHERE (cardinality($1::text[]) = 0 OR genre = ANY($1))
              AND NOT (id = ANY($2))
            ORDER BY seq
            LIMIT $3
            "#
        ))
        .bind(&query.genres)
        .bind(key_strings(&query.exclude))
        .bind(query.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }

    async fn count(&self) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn window(&self, offset: u64, limit: u64) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies ORDER BY seq OFFSET $1 LIMIT $2"
        ))
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(movies)
    }
}

#[async_trait::async_trait]
impl FavoriteStore for PgStore {
    async fn add_favorite(&self, user_id: Uuid, movie: WatchlistMovie) -> AppResult<Favorite> {
        let favorite = sqlx::query_as::<_, Favorite>(&format!(
            r#"
            INSERT INTO favorites (id, user_id, movie_id, title, poster_path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FAVORITE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(movie.movie_id.as_str())
        .bind(&movie.title)
        .bind(&movie.poster_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(favorite)
    }

    async fn favorites_for(&self, user_id: Uuid) -> AppResult<Vec<Favorite>> {
        let favorites = sqlx::query_as::<_, Favorite>(&format!(
            "SELECT {FAVORITE_COLUMNS} FROM favorites WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(favorites)
    }

    async fn remove_favorite(&self, user_id: Uuid, movie_id: &MovieKey) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND movie_id = $2")
            .bind(user_id)
            .bind(movie_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl WatchlistStore for PgStore {
    async fn create_watchlist(&self, user_id: Uuid, name: String) -> AppResult<Watchlist> {
        let row = sqlx::query_as::<_, WatchlistRow>(
            r#"
            INSERT INTO watchlists (id, user_id, name)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&name)
        .fetch_one(&self.pool)
        .await?;

        Ok(Watchlist {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            movies: Vec::new(),
            created_at: row.created_at,
        })
    }

    async fn watchlists_for(&self, user_id: Uuid) -> AppResult<Vec<Watchlist>> {
        let rows = sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT id, user_id, name, created_at
            FROM watchlists
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_watchlists(rows).await
    }

    async fn add_to_watchlist(
        &self,
        user_id: Uuid,
        watchlist_id: Uuid,
        movie: WatchlistMovie,
    ) -> AppResult<Option<Watchlist>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, WatchlistRow>(
            r#"
            SELECT id, user_id, name, created_at
            FROM watchlists
            WHERE id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(watchlist_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO watchlist_movies (watchlist_id, movie_id, title, poster_path)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(watchlist_id)
        .bind(movie.movie_id.as_str())
        .bind(&movie.title)
        .bind(&movie.poster_path)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let mut hydrated = self.hydrate_watchlists(vec![row]).await?;
        Ok(hydrated.pop())
    }
}

#[async_trait::async_trait]
impl ReviewStore for PgStore {
    async fn add_review(&self, user_id: Uuid, review: NewReview) -> AppResult<Review> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (id, user_id, movie_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(review.movie_id.as_str())
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    async fn reviews_for(&self, user_id: Uuid) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE user_id = $1 ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn reviews_for_movie(&self, movie_id: &MovieKey) -> AppResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE movie_id = $1 ORDER BY created_at"
        ))
        .bind(movie_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    async fn find_review(&self, review_id: Uuid) -> AppResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"
        ))
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn update_review(
        &self,
        review_id: Uuid,
        update: ReviewUpdate,
    ) -> AppResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r#"
            UPDATE reviews
            SET rating = $2, comment = $3
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "#
        ))
        .bind(review_id)
        .bind(update.rating)
        .bind(&update.comment)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    async fn delete_review(&self, review_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
