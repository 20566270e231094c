use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::User,
};

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
    }
}

/// Issues and validates HS256 access tokens
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, expiration_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration: Duration::hours(expiration_hours),
        }
    }

    /// Signs a token for the user
    pub fn issue(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiration).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Checks signature and expiry
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                AppError::Unauthorized("Invalid token".to_string())
            })
    }

    /// Extracts the token from an `Authorization: Bearer <token>` value
    pub fn bearer_token(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Name of the httpOnly cookie carrying the refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The cookie is only sent to the auth endpoints
const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Lifetime and cookie attributes of refresh sessions
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    lifetime: Duration,
    secure_cookie: bool,
}

impl RefreshPolicy {
    pub fn new(lifetime_days: i64, secure_cookie: bool) -> Self {
        Self {
            lifetime: Duration::days(lifetime_days),
            secure_cookie,
        }
    }

    /// 40 random bytes, hex encoded
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 40];
        rand::thread_rng().fill(&mut bytes[..]);
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + self.lifetime
    }

    /// `Set-Cookie` value storing the token
    pub fn cookie(&self, token: &str) -> AppResult<HeaderValue> {
        self.render(token, self.lifetime.num_seconds().max(0))
    }

    /// `Set-Cookie` value expiring the cookie immediately
    pub fn cleared_cookie(&self) -> AppResult<HeaderValue> {
        self.render("", 0)
    }

    fn render(&self, token: &str, max_age: i64) -> AppResult<HeaderValue> {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Strict; Path={}; Max-Age={}",
            REFRESH_COOKIE, token, REFRESH_COOKIE_PATH, max_age
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|e| AppError::Internal(format!("Invalid refresh cookie: {}", e)))
    }

    /// Reads the refresh token out of the request's `Cookie` headers
    pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == REFRESH_COOKIE)
            .map(|(_, token)| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

/// Hashes a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| AppError::Internal(format!("Failed to build salt: {}", e)))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Checks a password against a stored hash
pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let manager = JwtManager::new("test-secret", 1);
        let user = user();

        let token = manager.issue(&user).unwrap();
        let claims = manager.verify(&token).unwrap();

        assert_eq!(claims.user_id().unwrap(), user.id);
        assert_eq!(claims.username, "testuser");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtManager::new("secret-a", 1).issue(&user()).unwrap();
        let err = JwtManager::new("secret-b", 1).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret", -2);
        let token = manager.issue(&user()).unwrap();
        assert!(manager.verify(&token).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(JwtManager::bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(JwtManager::bearer_token("Bearer "), None);
        assert_eq!(JwtManager::bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_refresh_tokens_are_random_hex() {
        let a = RefreshPolicy::generate_token();
        let b = RefreshPolicy::generate_token();

        assert_eq!(a.len(), 80);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = RefreshPolicy::new(7, false).cookie("abc").unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("refreshToken=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/api/auth"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));

        let secure = RefreshPolicy::new(7, true).cookie("abc").unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn test_cleared_cookie_expires_immediately() {
        let cookie = RefreshPolicy::new(7, false).cleared_cookie().unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_refresh_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(RefreshPolicy::token_from_headers(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; refreshToken=abc123"));
        assert_eq!(
            RefreshPolicy::token_from_headers(&headers),
            Some("abc123".to_string())
        );

        headers.insert(COOKIE, HeaderValue::from_static("refreshToken="));
        assert_eq!(RefreshPolicy::token_from_headers(&headers), None);
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret123", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
