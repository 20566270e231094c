use std::sync::Arc;

use axum::{
    http::{
        header::{
            AUTHORIZATION, CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
        HeaderValue, Method, StatusCode,
    },
    middleware::from_fn,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{JwtManager, MetadataProvider, Recommender, RefreshPolicy},
    store::Stores,
};

pub mod auth;
pub mod favorites;
pub mod movies;
pub mod profile;
pub mod reviews;
pub mod watchlists;

/// Shared handles for every handler
pub struct AppState {
    pub stores: Stores,
    pub recommender: Recommender,
    pub metadata: Arc<dyn MetadataProvider>,
    pub tokens: JwtManager,
    pub refresh: RefreshPolicy,
}

impl AppState {
    pub fn new(
        stores: Stores,
        recommender: Recommender,
        metadata: Arc<dyn MetadataProvider>,
        tokens: JwtManager,
        refresh: RefreshPolicy,
    ) -> Self {
        Self {
            stores,
            recommender,
            metadata,
            tokens,
            refresh,
        }
    }
}

/// Creates the application router with all routes and layers
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(cors_layer(cors_origins))
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_FRAME_OPTIONS,
                    HeaderValue::from_static("SAMEORIGIN"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    REFERRER_POLICY,
                    HeaderValue::from_static("no-referrer"),
                )),
        )
        .with_state(state)
}

/// Routes under /api
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        // Catalog, recommendations and metadata
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/recommendations", get(movies::recommendations))
        .route("/movies/search", get(movies::search))
        .route("/movies/:id", get(movies::details))
        // Favorites
        .route("/favorites", get(favorites::list).post(favorites::add))
        .route("/favorites/:movie_id", delete(favorites::remove))
        // Watchlists
        .route("/watchlists", get(watchlists::list).post(watchlists::create))
        .route("/watchlists/:id/movies", post(watchlists::add_movie))
        // Reviews
        .route("/reviews", post(reviews::create))
        .route("/reviews/user/:user_id", get(reviews::for_user))
        .route(
            "/reviews/:id",
            get(reviews::for_movie)
                .put(reviews::update)
                .delete(reviews::remove),
        )
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
