use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{Favorite, MovieKey, WatchlistMovie},
    routes::AppState,
};

pub async fn add(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(movie): Json<WatchlistMovie>,
) -> AppResult<(StatusCode, Json<Favorite>)> {
    movie.validate()?;

    let favorite = state.stores.favorites.add_favorite(auth.user_id, movie).await?;

    tracing::info!(user_id = %auth.user_id, movie_id = %favorite.movie_id, "Favorite added");

    Ok((StatusCode::CREATED, Json(favorite)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Favorite>>> {
    let favorites = state.stores.favorites.favorites_for(auth.user_id).await?;
    Ok(Json(favorites))
}

/// Removes the caller's favorite for a movie; succeeds even if none existed
pub async fn remove(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(movie_id): Path<String>,
) -> AppResult<Json<Value>> {
    let removed = state
        .stores
        .favorites
        .remove_favorite(auth.user_id, &MovieKey::new(movie_id))
        .await?;

    tracing::debug!(user_id = %auth.user_id, removed, "Favorite removal");

    Ok(Json(json!({ "message": "Favorite removed" })))
}
