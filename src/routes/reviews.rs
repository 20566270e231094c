use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{MovieKey, NewReview, Review, ReviewUpdate},
    routes::AppState,
};

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(review): Json<NewReview>,
) -> AppResult<(StatusCode, Json<Review>)> {
    review.validate()?;

    let review = state.stores.reviews.add_review(auth.user_id, review).await?;

    tracing::info!(
        user_id = %auth.user_id,
        movie_id = %review.movie_id,
        rating = review.rating,
        "Review added"
    );

    Ok((StatusCode::CREATED, Json(review)))
}

/// Reviews of one movie, public
pub async fn for_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = state
        .stores
        .reviews
        .reviews_for_movie(&MovieKey::new(movie_id))
        .await?;
    Ok(Json(reviews))
}

/// Reviews written by one user, public
pub async fn for_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<Review>>> {
    let user_id = Uuid::parse_str(&user_id)
        .map_err(|_| AppError::InvalidInput("Invalid user id".to_string()))?;

    let reviews = state.stores.reviews.reviews_for(user_id).await?;
    Ok(Json(reviews))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(review_id): Path<String>,
    Json(update): Json<ReviewUpdate>,
) -> AppResult<Json<Review>> {
    update.validate()?;

    let review_id = owned_review(&state, &auth, &review_id).await?;

    let review = state
        .stores
        .reviews
        .update_review(review_id, update)
        .await?
        .ok_or_else(review_not_found)?;

    Ok(Json(review))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(review_id): Path<String>,
) -> AppResult<Json<Value>> {
    let review_id = owned_review(&state, &auth, &review_id).await?;

    if !state.stores.reviews.delete_review(review_id).await? {
        return Err(review_not_found());
    }

    tracing::info!(user_id = %auth.user_id, review_id = %review_id, "Review deleted");

    Ok(Json(json!({ "message": "Review deleted" })))
}

/// Resolves a review id the caller is allowed to change
async fn owned_review(state: &AppState, auth: &AuthUser, raw_id: &str) -> AppResult<Uuid> {
    let review_id = Uuid::parse_str(raw_id).map_err(|_| review_not_found())?;

    let review = state
        .stores
        .reviews
        .find_review(review_id)
        .await?
        .ok_or_else(review_not_found)?;

    if review.user_id != auth.user_id {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    Ok(review_id)
}

fn review_not_found() -> AppError {
    AppError::NotFound("Review not found".to_string())
}
