use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::Serialize;
use time::Duration;

use crate::oauth::PendingAuthorization;

const PENDING_COOKIE_NAME: &str = "grades_pkce";

/// JSON cookie payload. Our payloads are plain string and bool structs, so this
/// only fails for a broken `Serialize` impl; the empty value then reads back as absent.
pub(super) fn encode_value<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Cookie payload failed to serialize");
        String::new()
    })
}

/// Short-lived cookie carrying the PKCE verifier and state nonce through the
/// provider redirect. The callback lands on `/`, so the path is `/`.
pub(super) fn pending_cookie(pending: &PendingAuthorization, secure: bool) -> Cookie<'static> {
    let value = encode_value(pending);
    Cookie::build((PENDING_COOKIE_NAME, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::minutes(5))
        .build()
}

pub(super) fn clear_pending_cookie() -> Cookie<'static> {
    Cookie::build((PENDING_COOKIE_NAME, "")).path("/").build()
}

/// PKCE state issued by `/login`, if the browser still holds a valid one.
pub(super) fn get_pending(jar: &PrivateCookieJar) -> Option<PendingAuthorization> {
    jar.get(PENDING_COOKIE_NAME)
        .and_then(|c| serde_json::from_str(c.value()).ok())
}

pub(super) fn session_cookie(
    name: &str,
    value: String,
    ttl_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(ttl_days))
        .build()
}

pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), "")).path("/").build()
}
