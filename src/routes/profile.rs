use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{
    error::{AppError, AppResult},
    middleware::AuthUser,
    models::{ProfileUpdate, User},
    routes::AppState,
};

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<User>> {
    let user = state
        .stores
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Changes username and/or email; omitted fields are left alone
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let update = update.trimmed();
    update.validate()?;

    let user = state
        .stores
        .users
        .update_profile(auth.user_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(user))
}
