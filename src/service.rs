//! Session Service
//!
//! Core account and session lifecycle: registration, login, refresh token
//! rotation, logout, password changes, and profile mutation. Persistence and
//! media upload are reached through their ports, so the whole lifecycle runs
//! against in-memory doubles in tests.

use std::path::PathBuf;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::error::ApiError;
use crate::media::{self, MediaHost};
use crate::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, NewUser, RegisterInput, TokenResponse,
    UpdateAccountRequest, User, UserResponse,
};
use crate::store::UserStore;
use crate::tokens::{TokenError, TokenService};

/// Account and session transitions over the collaborator ports
pub struct SessionService {
    store: Arc<dyn UserStore>,
    media: Arc<dyn MediaHost>,
    tokens: TokenService,
}

impl SessionService {
    pub fn new(store: Arc<dyn UserStore>, media: Arc<dyn MediaHost>, tokens: TokenService) -> Self {
        Self {
            store,
            media,
            tokens,
        }
    }

    /// Token service access for cookie lifetimes
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new account from the multipart form input
    pub async fn register(&self, input: RegisterInput) -> Result<UserResponse, ApiError> {
        let avatar = input.avatar.clone();
        let cover_image = input.cover_image.clone();

        let result = self.try_register(input).await;

        // Uploads remove their spool file themselves; anything left behind
        // belongs to a request that failed before reaching the host.
        if result.is_err() {
            if let Some(path) = avatar.as_deref() {
                media::remove_spooled(path).await;
            }
            if let Some(path) = cover_image.as_deref() {
                media::remove_spooled(path).await;
            }
        }

        result
    }

    async fn try_register(&self, input: RegisterInput) -> Result<UserResponse, ApiError> {
        let full_name = input.full_name.trim().to_string();
        let user_name = input.user_name.trim().to_lowercase();
        let email = input.email.trim().to_lowercase();

        if full_name.is_empty()
            || user_name.is_empty()
            || email.is_empty()
            || input.password.trim().is_empty()
        {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }

        if !email.validate_email() {
            return Err(ApiError::Validation("Invalid email format".to_string()));
        }

        // Check either identifier is free
        if self
            .store
            .find_by_email_or_username(&email, &user_name)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(
                "Email or username already exists".to_string(),
            ));
        }

        let avatar_path = input
            .avatar
            .as_deref()
            .ok_or_else(|| ApiError::Validation("Avatar file is required".to_string()))?;

        let avatar = self
            .media
            .upload(avatar_path)
            .await
            .ok_or_else(|| ApiError::Upload("Failed to upload avatar".to_string()))?;

        // A failed cover upload degrades to no cover image
        let cover_image_url = match input.cover_image.as_deref() {
            Some(path) => self.media.upload(path).await.map(|asset| asset.url),
            None => None,
        };

        let password_hash = hash_password(&input.password)?;

        let user = self
            .store
            .create(NewUser {
                user_name,
                email,
                full_name,
                password_hash,
                avatar_url: avatar.url,
                cover_image_url,
            })
            .await?;

        // Read back the created row
        let created = self.store.find_by_id(user.id).await?.ok_or_else(|| {
            ApiError::Persistence("User not created, please try again".to_string())
        })?;

        tracing::info!(user_id = %created.id, user_name = %created.user_name, "User registered");

        Ok(UserResponse::from(created))
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Verify credentials and open a session
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ApiError> {
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let identifier = req
            .user_name
            .or(req.email)
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Validation("Username or email is required".to_string()))?;

        let user = self
            .store
            .find_by_email_or_username(&identifier, &identifier)
            .await?
            .ok_or_else(|| ApiError::NotFound("User does not exist".to_string()))?;

        if !verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(ApiError::Authentication(
                "Invalid user credentials".to_string(),
            ));
        }

        let access_token = self.tokens.issue_access(&user).map_err(token_issue_error)?;
        let refresh_token = self
            .tokens
            .issue_refresh(user.id)
            .map_err(token_issue_error)?;

        // Single slot: whatever was stored before is gone now
        self.store
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
        })
    }

    /// Drop the stored refresh token, ending the session
    pub async fn logout(&self, user_id: Uuid) -> Result<(), ApiError> {
        self.store.set_refresh_token(user_id, None).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    // ============================================
    // Session Refresh
    // ============================================

    /// Rotate the refresh token: the presented token must equal the stored
    /// one exactly, and both tokens are reissued on success.
    pub async fn refresh_session(
        &self,
        presented: Option<String>,
    ) -> Result<TokenResponse, ApiError> {
        let presented = presented
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::Authentication("Unauthorized request".to_string()))?;

        let claims = self.tokens.verify_refresh(&presented).map_err(|err| {
            tracing::debug!("Refresh token rejected: {}", err);
            ApiError::Authentication("Invalid refresh token".to_string())
        })?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| ApiError::Authentication("Invalid refresh token".to_string()))?;

        if user.refresh_token.as_deref() != Some(presented.as_str()) {
            tracing::warn!(user_id = %user.id, "Stale refresh token presented");
            return Err(ApiError::Authentication(
                "Invalid refresh token".to_string(),
            ));
        }

        let access_token = self.tokens.issue_access(&user).map_err(token_issue_error)?;
        let refresh_token = self
            .tokens
            .issue_refresh(user.id)
            .map_err(token_issue_error)?;

        self.store
            .set_refresh_token(user.id, Some(&refresh_token))
            .await?;

        tracing::info!(user_id = %user.id, "Session refreshed");

        Ok(TokenResponse {
            access_token,
            refresh_token,
        })
    }

    // ============================================
    // Authentication Gate Support
    // ============================================

    /// Resolve an access token to its account. Every failure is an
    /// authentication failure to the caller.
    pub async fn authenticate(&self, token: &str) -> Result<User, ApiError> {
        let claims = self.tokens.verify_access(token).map_err(|err| {
            tracing::debug!("Access token rejected: {}", err);
            ApiError::Authentication("Invalid access token".to_string())
        })?;

        let user = self
            .store
            .find_by_id(claims.sub)
            .await
            .map_err(|err| {
                tracing::error!("Account lookup failed during authentication: {}", err);
                ApiError::Authentication("Invalid access token".to_string())
            })?
            .ok_or_else(|| ApiError::Authentication("Invalid access token".to_string()))?;

        Ok(user)
    }

    // ============================================
    // Password Management
    // ============================================

    /// Change the password of an authenticated account
    pub async fn change_password(
        &self,
        user: &User,
        req: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        req.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        if req.old_password.trim().is_empty() || req.new_password.trim().is_empty() {
            return Err(ApiError::Validation("All fields are required".to_string()));
        }

        if !verify_password(&req.old_password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "Password change rejected: wrong old password");
            return Err(ApiError::Authentication("Invalid old password".to_string()));
        }

        let password_hash = hash_password(&req.new_password)?;
        self.store.set_password_hash(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    // ============================================
    // Profile Updates
    // ============================================

    /// Apply the present profile fields
    pub async fn update_profile(
        &self,
        user: &User,
        req: UpdateAccountRequest,
    ) -> Result<UserResponse, ApiError> {
        let full_name = req.full_name.map(|v| v.trim().to_string());
        let email = req.email.map(|v| v.trim().to_lowercase());

        if full_name.is_none() && email.is_none() {
            return Err(ApiError::Validation(
                "At least one field is required".to_string(),
            ));
        }

        if matches!(full_name.as_deref(), Some("")) || matches!(email.as_deref(), Some("")) {
            return Err(ApiError::Validation("Fields cannot be empty".to_string()));
        }

        if let Some(ref email) = email {
            if !email.validate_email() {
                return Err(ApiError::Validation("Invalid email format".to_string()));
            }

            // The new email must not belong to another account
            if let Some(existing) = self.store.find_by_email(email).await? {
                if existing.id != user.id {
                    return Err(ApiError::Conflict("Email already in use".to_string()));
                }
            }
        }

        let updated = self
            .store
            .update_profile(user.id, full_name.as_deref(), email.as_deref())
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user.id, "Account details updated");
        Ok(UserResponse::from(updated))
    }

    /// Upload a new avatar and replace the stored URL
    pub async fn update_avatar(
        &self,
        user: &User,
        spooled: Option<PathBuf>,
    ) -> Result<UserResponse, ApiError> {
        let path = spooled
            .ok_or_else(|| ApiError::Validation("Avatar file is missing".to_string()))?;

        let asset = self
            .media
            .upload(&path)
            .await
            .ok_or_else(|| ApiError::Upload("Failed to upload avatar".to_string()))?;

        let updated = self
            .store
            .set_avatar_url(user.id, &asset.url)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user.id, "Avatar updated");
        Ok(UserResponse::from(updated))
    }

    /// Upload a new cover image and replace the stored URL
    pub async fn update_cover_image(
        &self,
        user: &User,
        spooled: Option<PathBuf>,
    ) -> Result<UserResponse, ApiError> {
        let path = spooled
            .ok_or_else(|| ApiError::Validation("Cover image file is missing".to_string()))?;

        let asset = self
            .media
            .upload(&path)
            .await
            .ok_or_else(|| ApiError::Upload("Failed to upload cover image".to_string()))?;

        let updated = self
            .store
            .set_cover_image_url(user.id, &asset.url)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user.id, "Cover image updated");
        Ok(UserResponse::from(updated))
    }
}

// ============================================
// Password Hashing
// ============================================

/// Hash a password using Argon2id
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    Ok(hash)
}

/// Verify a password against a stored hash
fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| ApiError::Internal)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn token_issue_error(err: TokenError) -> ApiError {
    tracing::error!("Token issue failed: {}", err);
    ApiError::Internal
}
