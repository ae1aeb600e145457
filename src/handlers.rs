//! HTTP Handlers
//!
//! REST API endpoints for account and session operations, plus the router
//! assembly with its middleware stack.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::cookies::{
    clear_session_cookies, cookie_value, set_session_cookies, REFRESH_TOKEN_COOKIE,
};
use crate::error::{ApiError, ApiResponse};
use crate::extractors::{ApiJson, CurrentUser};
use crate::media::{self, MAX_FILE_SIZE};
use crate::middleware::require_auth;
use crate::models::{
    ChangePasswordRequest, LoginRequest, RefreshTokenRequest, RegisterInput, UpdateAccountRequest,
    UserResponse,
};
use crate::service::SessionService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SessionService>,
    pub spool_dir: PathBuf,
}

/// Registration may carry two images beside the text fields
const MAX_MULTIPART_BYTES: usize = 2 * MAX_FILE_SIZE + 1024 * 1024;

// ============================================
// Route Builder
// ============================================

/// Create the application router
pub fn create_router(state: AppState, cors_origin: &str) -> Router {
    let public = Router::new()
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token))
        .route("/healthz", get(healthz));

    let register_routes = Router::new()
        .route("/register", post(register))
        .layer(DefaultBodyLimit::max(MAX_MULTIPART_BYTES));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account));

    let protected_uploads = Router::new()
        .route("/update-avatar", patch(update_avatar))
        .route("/update-cover-image", patch(update_cover_image))
        .layer(DefaultBodyLimit::max(MAX_MULTIPART_BYTES));

    let protected = protected
        .merge(protected_uploads)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(register_routes)
        .merge(protected)
        .fallback(not_found)
        .layer(CookieManagerLayer::new())
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, allowing none");
            cors
        }
    }
}

// ============================================
// Registration
// ============================================

/// POST /register
///
/// Register a new account from a multipart form
pub async fn register(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let input = collect_register_input(&state.spool_dir, &mut multipart).await?;

    let user = state.service.register(input).await?;

    Ok(ApiResponse::new(
        StatusCode::CREATED,
        user,
        "User created successfully",
    ))
}

/// Assemble the registration input from the multipart fields, spooling the
/// file parts to disk. Partial spools are removed if a later field fails.
async fn collect_register_input(
    spool_dir: &Path,
    multipart: &mut Multipart,
) -> Result<RegisterInput, ApiError> {
    let mut input = RegisterInput::default();

    if let Err(err) = fill_register_input(spool_dir, multipart, &mut input).await {
        if let Some(path) = input.avatar.as_deref() {
            media::remove_spooled(path).await;
        }
        if let Some(path) = input.cover_image.as_deref() {
            media::remove_spooled(path).await;
        }
        return Err(err);
    }

    Ok(input)
}

async fn fill_register_input(
    spool_dir: &Path,
    multipart: &mut Multipart,
    input: &mut RegisterInput,
) -> Result<(), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "fullName" => input.full_name = field.text().await?,
            "email" => input.email = field.text().await?,
            "userName" => input.user_name = field.text().await?,
            "password" => input.password = field.text().await?,
            // First file part wins for each slot
            "avatar" => {
                if input.avatar.is_none() {
                    input.avatar = Some(media::spool_field(spool_dir, field).await?);
                }
            }
            "coverImage" => {
                if input.cover_image.is_none() {
                    input.cover_image = Some(media::spool_field(spool_dir, field).await?);
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Spool the first file part with the given name, if any
async fn collect_single_file(
    spool_dir: &Path,
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Option<PathBuf>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(field_name) {
            return Ok(Some(media::spool_field(spool_dir, field).await?));
        }
    }

    Ok(None)
}

// ============================================
// Login / Logout
// ============================================

/// POST /login
///
/// Verify credentials and open a session; the token pair also rides in
/// httpOnly cookies
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.service.login(req).await?;

    set_session_cookies(
        &cookies,
        &auth.access_token,
        &auth.refresh_token,
        state.service.tokens().access_expiry_secs(),
        state.service.tokens().refresh_expiry_secs(),
    );

    Ok(ApiResponse::ok(auth, "User logged in successfully"))
}

/// POST /logout
///
/// Drop the stored refresh token and clear both cookies
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.service.logout(user.id).await?;

    clear_session_cookies(&cookies);

    Ok(ApiResponse::ok(serde_json::json!({}), "User logged out"))
}

// ============================================
// Token Refresh
// ============================================

/// POST /refresh-token
///
/// Rotate the refresh token. The cookie is read first, the JSON body is the
/// fallback for non-browser clients.
pub async fn refresh_token(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Option<ApiJson<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let presented = cookie_value(&cookies, REFRESH_TOKEN_COOKIE)
        .or_else(|| body.and_then(|ApiJson(req)| req.refresh_token));

    let pair = state.service.refresh_session(presented).await?;

    set_session_cookies(
        &cookies,
        &pair.access_token,
        &pair.refresh_token,
        state.service.tokens().access_expiry_secs(),
        state.service.tokens().refresh_expiry_secs(),
    );

    Ok(ApiResponse::ok(pair, "Access token refreshed"))
}

// ============================================
// Password Management
// ============================================

/// POST /change-password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.change_password(&user, req).await?;

    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

// ============================================
// Profile
// ============================================

/// GET /current-user
pub async fn current_user(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    ApiResponse::ok(UserResponse::from(&user), "User fetched successfully")
}

/// PATCH /update-account
pub async fn update_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(req): ApiJson<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.service.update_profile(&user, req).await?;

    Ok(ApiResponse::ok(
        updated,
        "Account details updated successfully",
    ))
}

/// PATCH /update-avatar
pub async fn update_avatar(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let spooled = collect_single_file(&state.spool_dir, &mut multipart, "avatar").await?;

    let updated = state.service.update_avatar(&user, spooled).await?;

    Ok(ApiResponse::ok(updated, "Avatar updated successfully"))
}

/// PATCH /update-cover-image
pub async fn update_cover_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let spooled = collect_single_file(&state.spool_dir, &mut multipart, "coverImage").await?;

    let updated = state.service.update_cover_image(&user, spooled).await?;

    Ok(ApiResponse::ok(updated, "Cover image updated successfully"))
}

// ============================================
// Liveness
// ============================================

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "status": "ok" }), "OK")
}

/// Fallback for unknown routes, keeping 404s in the envelope
async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
