//! Account Models
//!
//! Data structures for account requests, responses, database entities, and
//! token claims. All client-facing JSON is camelCase.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

// ============================================
// Database Entities
// ============================================

/// User entity from database
///
/// `password_hash` and `refresh_token` never serialize; every response path
/// goes through [`UserResponse`] anyway.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

// ============================================
// Request DTOs
// ============================================

/// Registration input assembled from the multipart form
///
/// The file fields hold paths to the spooled uploads, not bytes.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub full_name: String,

    pub email: String,

    pub user_name: String,

    pub password: String,

    pub avatar: Option<PathBuf>,

    pub cover_image: Option<PathBuf>,
}

/// Login request. Clients send either identifier.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: Option<String>,

    pub email: Option<String>,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh token request body, the fallback when no cookie is present
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: Option<String>,
}

/// Change password request (for authenticated users)
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Old password is required"))]
    pub old_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Profile update request. Both fields optional, at least one required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

// ============================================
// Response DTOs
// ============================================

/// User response (public account data without credential fields)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar_url: user.avatar_url.clone(),
            cover_image_url: user.cover_image_url.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Login response with the issued token pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Token rotation response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

// ============================================
// JWT Claims
// ============================================

/// JWT claims for access tokens
///
/// Carries display fields so clients can render the session owner without a
/// profile round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
}

/// JWT claims for refresh tokens
///
/// Deliberately minimal: the account id plus a unique `jti`, so every issued
/// token is a distinct string even inside one clock second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    /// JWT ID (unique identifier)
    pub jti: Uuid,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Example".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            avatar_url: "https://media.example.com/avatar.png".to_string(),
            cover_image_url: None,
            refresh_token: Some("some.jwt.token".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_serialization_excludes_secrets() {
        let value = serde_json::to_value(sample_user()).unwrap();

        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
        assert!(value.get("refreshToken").is_none());
        assert!(value.get("refresh_token").is_none());
        assert_eq!(value["userName"], "alice");
        assert_eq!(value["fullName"], "Alice Example");
    }

    #[test]
    fn test_user_response_has_no_secret_fields() {
        let response = UserResponse::from(sample_user());
        let value = serde_json::to_value(response).unwrap();

        assert!(value.get("passwordHash").is_none());
        assert!(value.get("refreshToken").is_none());
        assert_eq!(value["email"], "alice@example.com");
        assert_eq!(value["avatarUrl"], "https://media.example.com/avatar.png");
        assert!(value["coverImageUrl"].is_null());
    }

    #[test]
    fn test_login_request_accepts_either_identifier() {
        let by_name: LoginRequest =
            serde_json::from_str(r#"{"userName": "alice", "password": "pw"}"#).unwrap();
        assert_eq!(by_name.user_name.as_deref(), Some("alice"));
        assert!(by_name.email.is_none());

        let by_email: LoginRequest =
            serde_json::from_str(r#"{"email": "alice@example.com", "password": "pw"}"#).unwrap();
        assert!(by_email.user_name.is_none());
        assert_eq!(by_email.email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn test_access_claims_camel_case_keys() {
        let claims = AccessTokenClaims {
            sub: Uuid::new_v4(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Example".to_string(),
            iat: 0,
            exp: 0,
            iss: "vidstream-api".to_string(),
            jti: Uuid::new_v4(),
        };

        let value = serde_json::to_value(claims).unwrap();
        assert!(value.get("userName").is_some());
        assert!(value.get("fullName").is_some());
        assert!(value.get("sub").is_some());
    }
}
