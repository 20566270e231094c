use std::sync::Arc;

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderValue, StatusCode,
};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};

use cinematch_api::{
    error::{AppError, AppResult},
    routes::{create_router, AppState},
    services::{
        JwtManager, MetadataProvider, Recommender, RefreshPolicy, SearchParams, SeededRandom,
    },
    store::Stores,
};

/// Canned metadata provider, no network
struct StubProvider;

#[async_trait::async_trait]
impl MetadataProvider for StubProvider {
    async fn search_movies(&self, params: &SearchParams) -> AppResult<Value> {
        params.validate()?;
        Ok(json!({
            "page": 1,
            "results": [{ "id": 603, "title": "The Matrix" }],
            "total_results": 1,
            "echo": params.cache_fragment(),
        }))
    }

    async fn movie_details(&self, movie_id: &str) -> AppResult<Value> {
        if movie_id == "0" {
            return Err(AppError::ExternalApi("TMDB details error".to_string()));
        }
        Ok(json!({ "id": movie_id, "credits": { "cast": [] }, "videos": { "results": [] } }))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn create_test_server() -> TestServer {
    let stores = Stores::in_memory();
    let recommender = Recommender::new(&stores, Arc::new(SeededRandom::new(42)));
    let state = Arc::new(AppState::new(
        stores,
        recommender,
        Arc::new(StubProvider),
        JwtManager::new("test-secret", 1),
        RefreshPolicy::new(7, false),
    ));
    let app = create_router(state, &["http://localhost:3000".to_string()]);
    TestServer::new(app).unwrap()
}

fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

/// Registers a user and returns the access token and user id
async fn register(server: &TestServer, username: &str) -> (String, String) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

/// The `refreshToken=<value>` pair from a response's Set-Cookie header
fn refresh_cookie(response: &axum_test::TestResponse) -> String {
    let header = response.header("set-cookie");
    let cookie = header.to_str().unwrap();
    cookie.split(';').next().unwrap().to_string()
}

async fn add_movie(server: &TestServer, token: &str, id: &str, genre: &str) {
    bearer(server.post("/api/movies"), token)
        .json(&json!({ "id": id, "title": format!("Movie {}", id), "genre": genre }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let id = "6f2d8c4e-1b7a-4c55-9a3e-0d9f8e7c6b5a";

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let server = create_test_server();

    for response in [
        server.get("/health").await,
        server.get("/api/movies/recommendations").await,
    ] {
        assert_eq!(response.header("x-content-type-options"), "nosniff");
        assert_eq!(response.header("x-frame-options"), "SAMEORIGIN");
        assert_eq!(response.header("referrer-policy"), "no-referrer");
    }
}

#[tokio::test]
async fn test_login_sets_refresh_cookie() {
    let server = create_test_server();
    register(&server, "ivy").await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "ivy@example.com", "password": "secret123" }))
        .await;
    response.assert_status_ok();

    let header = response.header("set-cookie");
    let cookie = header.to_str().unwrap();
    assert!(cookie.starts_with("refreshToken="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/api/auth"));
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let server = create_test_server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "jules",
            "email": "jules@example.com",
            "password": "secret123"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let cookie = refresh_cookie(&response);
    let user_id = response.json::<Value>()["user"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = server
        .post("/api/auth/refresh")
        .add_header(COOKIE, HeaderValue::from_str(&cookie).unwrap())
        .await;
    response.assert_status_ok();
    let token = response.json::<Value>()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let profile: Value = bearer(server.get("/api/profile"), &token).await.json();
    assert_eq!(profile["id"], user_id.as_str());

    let response = server
        .post("/api/auth/logout")
        .add_header(COOKIE, HeaderValue::from_str(&cookie).unwrap())
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Logged out" }));
    assert!(response
        .header("set-cookie")
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = server
        .post("/api/auth/refresh")
        .add_header(COOKIE, HeaderValue::from_str(&cookie).unwrap())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "error": "Invalid refresh token" }));
}

#[tokio::test]
async fn test_refresh_requires_cookie() {
    let server = create_test_server();

    let response = server.post("/api/auth/refresh").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "error": "No refresh token" }));

    server
        .post("/api/auth/logout")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_register_and_login() {
    let server = create_test_server();
    let (token, user_id) = register(&server, "alice").await;
    assert!(!token.is_empty());

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": "secret123" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": "wrong-password" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({ "error": "Invalid credentials" }));
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let server = create_test_server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "username": "bob", "email": "bob@example.com", "password": "123" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    register(&server, "bob").await;
    let response = server
        .post("/api/auth/register")
        .json(&json!({ "username": "bob", "email": "other@example.com", "password": "secret123" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = create_test_server();

    let response = server.get("/api/movies/recommendations").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "error": "No token provided" }));

    let response = bearer(server.get("/api/favorites"), "not-a-jwt").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({ "error": "Invalid token" }));

    let foreign = JwtManager::new("another-secret", 1);
    let user = cinematch_api::models::User {
        id: uuid::Uuid::new_v4(),
        username: "mallory".to_string(),
        email: "mallory@example.com".to_string(),
    };
    let token = foreign.issue(&user).unwrap();
    bearer(server.get("/api/profile"), &token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_get_and_update() {
    let server = create_test_server();
    let (token, _) = register(&server, "carol").await;
    register(&server, "dave").await;

    let response = bearer(server.get("/api/profile"), &token).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["username"], "carol");

    let response = bearer(server.put("/api/profile"), &token)
        .json(&json!({ "username": "caroline" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["username"], "caroline");
    assert_eq!(body["email"], "carol@example.com");

    bearer(server.put("/api/profile"), &token)
        .json(&json!({ "email": "dave@example.com" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_profile_update_trims_fields() {
    let server = create_test_server();
    let (token, _) = register(&server, "grace").await;
    register(&server, "dave").await;

    bearer(server.put("/api/profile"), &token)
        .json(&json!({ "username": " dave " }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let response = bearer(server.put("/api/profile"), &token)
        .json(&json!({ "username": "  gracie ", "email": " gracie@example.com " }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["username"], "gracie");
    assert_eq!(body["email"], "gracie@example.com");

    server
        .post("/api/auth/login")
        .json(&json!({ "email": "gracie@example.com", "password": "secret123" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_catalog_create_and_filter() {
    let server = create_test_server();
    let (token, _) = register(&server, "erin").await;

    add_movie(&server, &token, "550", "Drama").await;
    add_movie(&server, &token, "603", "Action").await;

    bearer(server.post("/api/movies"), &token)
        .json(&json!({ "id": 550, "title": "Duplicate" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    bearer(server.post("/api/movies"), &token)
        .json(&json!({ "title": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let all: Vec<Value> = server.get("/api/movies").await.json();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["id"], "550");

    let drama: Vec<Value> = server.get("/api/movies?genre=Drama").await.json();
    assert_eq!(drama.len(), 1);
    assert_eq!(drama[0]["title"], "Movie 550");

    let searched: Vec<Value> = server.get("/api/movies?search=movie%20603").await.json();
    assert_eq!(searched.len(), 1);
}

#[tokio::test]
async fn test_movie_ids_are_stored_canonical() {
    let server = create_test_server();
    let (token, _) = register(&server, "hank").await;

    let response = bearer(server.post("/api/movies"), &token)
        .json(&json!({ "id": " 0550 ", "title": "Fight Club" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["id"], "550");

    bearer(server.post("/api/movies"), &token)
        .json(&json!({ "id": "+550", "title": "Fight Club again" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let all: Vec<Value> = server.get("/api/movies").await.json();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["id"], "550");
}

#[tokio::test]
async fn test_favorites_flow() {
    let server = create_test_server();
    let (token, _) = register(&server, "frank").await;

    let response = bearer(server.post("/api/favorites"), &token)
        .json(&json!({ "movieId": 550, "title": "Fight Club", "posterPath": "/p.jpg" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let favorite: Value = response.json();
    assert_eq!(favorite["movieId"], "550");

    let favorites: Vec<Value> = bearer(server.get("/api/favorites"), &token).await.json();
    assert_eq!(favorites.len(), 1);

    let response = bearer(server.delete("/api/favorites/550"), &token).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Favorite removed" }));

    let favorites: Vec<Value> = bearer(server.get("/api/favorites"), &token).await.json();
    assert!(favorites.is_empty());
}

#[tokio::test]
async fn test_watchlists_are_owner_scoped() {
    let server = create_test_server();
    let (owner, _) = register(&server, "grace").await;
    let (intruder, _) = register(&server, "heidi").await;

    let response = bearer(server.post("/api/watchlists"), &owner)
        .json(&json!({ "name": "Weekend" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let watchlist: Value = response.json();
    let path = format!("/api/watchlists/{}/movies", watchlist["id"].as_str().unwrap());

    let response = bearer(server.post(&path), &owner)
        .json(&json!({ "movieId": "603", "title": "The Matrix" }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["movies"][0]["movieId"], "603");

    bearer(server.post(&path), &intruder)
        .json(&json!({ "movieId": "604" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let lists: Vec<Value> = bearer(server.get("/api/watchlists"), &intruder).await.json();
    assert!(lists.is_empty());
}

#[tokio::test]
async fn test_reviews_crud_and_ownership() {
    let server = create_test_server();
    let (author, author_id) = register(&server, "ivan").await;
    let (other, _) = register(&server, "judy").await;

    bearer(server.post("/api/reviews"), &author)
        .json(&json!({ "movieId": "550", "rating": 11 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    bearer(server.post("/api/reviews"), &author)
        .json(&json!({ "movieId": "550", "rating": 8, "comment": "x".repeat(501) }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = bearer(server.post("/api/reviews"), &author)
        .json(&json!({ "movieId": "550", "rating": 8, "comment": "Great" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let review: Value = response.json();
    let review_path = format!("/api/reviews/{}", review["id"].as_str().unwrap());

    let for_movie: Vec<Value> = server.get("/api/reviews/550").await.json();
    assert_eq!(for_movie.len(), 1);

    let by_user: Vec<Value> = server
        .get(&format!("/api/reviews/user/{}", author_id))
        .await
        .json();
    assert_eq!(by_user.len(), 1);

    bearer(server.put(&review_path), &other)
        .json(&json!({ "rating": 1 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = bearer(server.put(&review_path), &author)
        .json(&json!({ "rating": 9, "comment": "Even better" }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["rating"], 9);

    bearer(server.delete(&review_path), &other)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = bearer(server.delete(&review_path), &author).await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Review deleted" }));

    bearer(server.delete(&review_path), &author)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_prefer_seen_genres() {
    let server = create_test_server();
    let (token, _) = register(&server, "kate").await;

    for i in 1..=6 {
        add_movie(&server, &token, &format!("d{}", i), "Drama").await;
    }
    for i in 1..=4 {
        add_movie(&server, &token, &format!("c{}", i), "Comedy").await;
    }

    bearer(server.post("/api/favorites"), &token)
        .json(&json!({ "movieId": "d1" }))
        .await
        .assert_status(StatusCode::CREATED);
    bearer(server.post("/api/reviews"), &token)
        .json(&json!({ "movieId": "d2", "rating": 7 }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = bearer(server.get("/api/movies/recommendations"), &token).await;
    response.assert_status_ok();
    let movies: Vec<Value> = response.json();
    let ids: Vec<&str> = movies.iter().map(|m| m["id"].as_str().unwrap()).collect();

    assert!(ids.len() >= 4 && ids.len() <= 5, "got {:?}", ids);
    assert_eq!(&ids[..4], &["d3", "d4", "d5", "d6"]);
    assert!(!ids.contains(&"d1") && !ids.contains(&"d2"));
}

#[tokio::test]
async fn test_recommendations_without_history_come_from_catalog() {
    let server = create_test_server();
    let (token, _) = register(&server, "leo").await;

    for i in 0..8 {
        add_movie(&server, &token, &i.to_string(), "Drama").await;
    }

    let movies: Vec<Value> = bearer(server.get("/api/movies/recommendations"), &token)
        .await
        .json();
    let ids: Vec<&str> = movies.iter().map(|m| m["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_metadata_proxy() {
    let server = create_test_server();

    let response = server.get("/api/movies/search?query=Matrix&genre=878").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["results"][0]["title"], "The Matrix");
    assert_eq!(body["echo"], "query=Matrix&with_genres=878");

    server
        .get("/api/movies/search")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/api/movies/550").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], "550");

    let response = server.get("/api/movies/0").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    response.assert_json(&json!({ "error": "TMDB details error" }));
}
