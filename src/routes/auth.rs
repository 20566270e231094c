use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderName, HeaderValue, StatusCode},
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{LoginRequest, NewUser, RegisterRequest, User},
    routes::AppState,
    services::{hash_password, verify_password, RefreshPolicy},
};

type SetCookie = [(HeaderName, HeaderValue); 1];

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

/// Issues an access token and stores a new refresh session for the user
async fn start_session(state: &AppState, user: &User) -> AppResult<(String, SetCookie)> {
    let token = state.tokens.issue(user)?;

    let refresh_token = RefreshPolicy::generate_token();
    state
        .stores
        .users
        .save_refresh_token(user.id, &refresh_token, state.refresh.expires_at())
        .await?;

    Ok((token, [(SET_COOKIE, state.refresh.cookie(&refresh_token)?)]))
}

/// Creates an account and signs the caller in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, SetCookie, Json<RegisterResponse>)> {
    request.validate()?;

    let user = state
        .stores
        .users
        .create_user(NewUser {
            username: request.username.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash: hash_password(&request.password)?,
        })
        .await?;
    let (token, cookie) = start_session(&state, &user).await?;

    tracing::info!(request_id = %request_id, user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        cookie,
        Json(RegisterResponse {
            message: "User registered successfully",
            token,
            user,
        }),
    ))
}

/// Exchanges email and password for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<LoginRequest>,
) -> AppResult<(SetCookie, Json<LoginResponse>)> {
    request.validate()?;

    let invalid = || AppError::InvalidInput("Invalid credentials".to_string());

    let account = state
        .stores
        .users
        .find_by_email(request.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &account.password_hash)? {
        tracing::info!(request_id = %request_id, "Login rejected");
        return Err(invalid());
    }

    let user = User::from(account);
    let (token, cookie) = start_session(&state, &user).await?;

    tracing::info!(request_id = %request_id, user_id = %user.id, "User logged in");

    Ok((cookie, Json(LoginResponse { token, user })))
}

/// Issues a fresh access token for the session in the refresh cookie
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> AppResult<Json<RefreshResponse>> {
    let refresh_token = RefreshPolicy::token_from_headers(&headers)
        .ok_or_else(|| AppError::Unauthorized("No refresh token".to_string()))?;

    let user = state
        .stores
        .users
        .user_for_refresh_token(&refresh_token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    let token = state.tokens.issue(&user)?;

    tracing::info!(request_id = %request_id, user_id = %user.id, "Access token refreshed");

    Ok(Json(RefreshResponse { token }))
}

/// Ends the refresh session, if any, and clears the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
) -> AppResult<(SetCookie, Json<Value>)> {
    if let Some(refresh_token) = RefreshPolicy::token_from_headers(&headers) {
        let revoked = state
            .stores
            .users
            .revoke_refresh_token(&refresh_token)
            .await?;
        tracing::info!(request_id = %request_id, revoked, "User logged out");
    }

    Ok((
        [(SET_COOKIE, state.refresh.cleared_cookie()?)],
        Json(json!({ "message": "Logged out" })),
    ))
}
