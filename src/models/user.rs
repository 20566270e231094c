use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

/// Public view of an account, never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// Stored account including credentials
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl From<UserAccount> for User {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
        }
    }
}

/// Account to be inserted, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.username.trim().is_empty() {
            return Err(AppError::InvalidInput("Username is required".to_string()));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::InvalidInput("Valid email is required".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> AppResult<()> {
        if !is_valid_email(&self.email) {
            return Err(AppError::InvalidInput("Valid email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::InvalidInput("Password is required".to_string()));
        }
        Ok(())
    }
}

/// Profile fields a user may change; absent fields stay as they are
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ProfileUpdate {
    /// Strips surrounding whitespace, matching how registration stores fields
    pub fn trimmed(self) -> Self {
        Self {
            username: self.username.map(|u| u.trim().to_string()),
            email: self.email.map(|e| e.trim().to_string()),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.username.as_ref().is_some_and(|u| u.trim().is_empty()) {
            return Err(AppError::InvalidInput("Username cannot be empty".to_string()));
        }
        if self.email.as_ref().is_some_and(|e| !is_valid_email(e)) {
            return Err(AppError::InvalidInput("Valid email is required".to_string()));
        }
        Ok(())
    }
}

/// Minimal structural check: one `@`, non-empty local part, dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !email.contains(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b@mail.example.org"));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[test]
    fn test_register_validation() {
        let request = RegisterRequest {
            username: "moviefan".to_string(),
            email: "fan@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(request.validate().is_ok());

        let short = RegisterRequest {
            password: "12345".to_string(),
            ..request
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_account_to_user_drops_hash() {
        let account = UserAccount {
            id: Uuid::new_v4(),
            username: "moviefan".to_string(),
            email: "fan@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
        };
        let user = User::from(account.clone());
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "moviefan");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_profile_update_is_trimmed_before_validation() {
        let update = ProfileUpdate {
            username: Some("  dave ".to_string()),
            email: Some(" dave@example.com\t".to_string()),
        }
        .trimmed();

        assert_eq!(update.username.as_deref(), Some("dave"));
        assert_eq!(update.email.as_deref(), Some("dave@example.com"));
        assert!(update.validate().is_ok());

        let blank = ProfileUpdate {
            username: Some("   ".to_string()),
            email: None,
        }
        .trimmed();
        assert!(blank.validate().is_err());
        assert_eq!(blank.email, None);
    }
}
