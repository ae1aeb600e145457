//! Authentication Middleware
//!
//! Access token gate for protected routes. The token is taken from the
//! session cookie first, then from the Authorization header.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::cookies::{cookie_value, ACCESS_TOKEN_COOKIE};
use crate::error::ApiError;
use crate::handlers::AppState;

/// Pull the access token from the cookie or the bearer header
fn access_token(cookies: &Cookies, req: &Request) -> Option<String> {
    cookie_value(cookies, ACCESS_TOKEN_COOKIE).or_else(|| {
        req.headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Require an authenticated account
///
/// Resolves the access token to its account and stores the account in
/// request extensions for handlers.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = access_token(&cookies, &req)
        .ok_or_else(|| ApiError::Authentication("Unauthorized, token not found".to_string()))?;

    let user = state.service.authenticate(&token).await?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
