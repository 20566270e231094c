use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{Watchlist, WatchlistMovie},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateWatchlistRequest {
    pub name: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<CreateWatchlistRequest>,
) -> AppResult<(StatusCode, Json<Watchlist>)> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Name is required".to_string()));
    }

    let watchlist = state
        .stores
        .watchlists
        .create_watchlist(auth.user_id, name.to_string())
        .await?;

    tracing::info!(user_id = %auth.user_id, watchlist_id = %watchlist.id, "Watchlist created");

    Ok((StatusCode::CREATED, Json(watchlist)))
}

/// Appends a movie to one of the caller's watchlists
pub async fn add_movie(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(watchlist_id): Path<String>,
    Json(movie): Json<WatchlistMovie>,
) -> AppResult<Json<Watchlist>> {
    movie.validate()?;

    let not_found = || AppError::NotFound("Watchlist not found".to_string());
    let watchlist_id = Uuid::parse_str(&watchlist_id).map_err(|_| not_found())?;

    let watchlist = state
        .stores
        .watchlists
        .add_to_watchlist(auth.user_id, watchlist_id, movie)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(watchlist))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Watchlist>>> {
    let watchlists = state.stores.watchlists.watchlists_for(auth.user_id).await?;
    Ok(Json(watchlists))
}
