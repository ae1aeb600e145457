//! Session Cookies
//!
//! The token pair rides in httpOnly cookies beside the JSON body, so browser
//! clients hold a session without touching the tokens from script.

use time::Duration;
use tower_cookies::{Cookie, Cookies};

/// Cookie name for the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie name for the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Build a session cookie scoped to the whole site
fn session_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie
}

/// Set both token cookies for an opened or refreshed session
pub fn set_session_cookies(
    cookies: &Cookies,
    access_token: &str,
    refresh_token: &str,
    access_max_age_secs: i64,
    refresh_max_age_secs: i64,
) {
    cookies.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        access_token.to_string(),
        access_max_age_secs,
    ));
    cookies.add(session_cookie(
        REFRESH_TOKEN_COOKIE,
        refresh_token.to_string(),
        refresh_max_age_secs,
    ));
}

/// Clear both token cookies by expiring them immediately
pub fn clear_session_cookies(cookies: &Cookies) {
    for name in [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE] {
        let mut cookie = Cookie::new(name, "");
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(true);
        cookie.set_max_age(Duration::seconds(-1));
        cookies.remove(cookie);
    }
}

/// Read a cookie value if present and non-empty
pub fn cookie_value(cookies: &Cookies, name: &str) -> Option<String> {
    cookies
        .get(name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
