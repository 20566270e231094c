use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::Value;

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::{Movie, MovieFilter, NewMovie},
    routes::AppState,
    services::SearchParams,
};

/// Lists the catalog, optionally filtered by title substring and genre
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<MovieFilter>,
) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.stores.catalog.list(&filter).await?;
    Ok(Json(movies))
}

/// Adds a movie to the catalog
pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<NewMovie>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    request.validate()?;

    let movie = state.stores.catalog.insert(request.into_movie()).await?;

    tracing::info!(user_id = %auth.user_id, movie_id = %movie.id, "Movie added to catalog");

    Ok((StatusCode::CREATED, Json(movie)))
}

/// Personalized recommendations for the caller
pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Movie>>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %auth.user_id,
        "Processing recommendation request"
    );

    let movies = state.recommender.recommend(auth.user_id).await?;

    tracing::info!(
        request_id = %request_id,
        returned = movies.len(),
        "Recommendations completed"
    );

    Ok(Json(movies))
}

/// Proxies a movie search to the metadata provider
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Value>> {
    tracing::info!(
        request_id = %request_id,
        provider = state.metadata.name(),
        query = ?params.query,
        "Searching movies"
    );

    let results = state.metadata.search_movies(&params).await?;
    Ok(Json(results))
}

/// Proxies a movie detail lookup to the metadata provider
pub async fn details(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> AppResult<Json<Value>> {
    let details = state.metadata.movie_details(&movie_id).await?;
    Ok(Json(details))
}
