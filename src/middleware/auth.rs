use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    routes::AppState,
    services::JwtManager,
};

/// The caller behind a valid bearer token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(JwtManager::bearer_token)
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

        let claims = state.tokens.verify(token)?;

        Ok(Self {
            user_id: claims.user_id()?,
            username: claims.username,
        })
    }
}
