use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use url::Url;

use super::error::AuthError;
use crate::oauth::{AuthClient, OAuthConfig};

const DEFAULT_REDIRECT_URI: &str = "https://localhost";

/// Cookie settings shared by config and runtime state.
#[derive(Clone)]
pub(crate) struct GatewaySettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
}

impl GatewaySettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "grades_session_id".into(),
            session_ttl_days: 14,
            secure_cookies: true,
        }
    }
}

/// Gateway configuration: the identity provider plus cookie settings.
///
/// Use [`from_env()`](GatewayConfig::from_env) for the VK ID client configured
/// from the environment, or [`new()`](GatewayConfig::new) with any
/// [`IdentityProvider`](super::IdentityProvider) and `with_*` methods.
pub struct GatewayConfig<P = AuthClient> {
    pub(super) provider: P,
    pub(super) settings: GatewaySettings,
}

impl<P> GatewayConfig<P> {
    /// All cookie settings use defaults; override with `with_*` methods.
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            settings: GatewaySettings::defaults(),
        }
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }
}

impl GatewayConfig<AuthClient> {
    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `VK_CLIENT_ID`: OAuth2 client ID
    /// - `VK_CLIENT_SECRET`: OAuth2 client secret (sent with `client_secret_post`)
    ///
    /// # Optional env vars
    /// - `VK_REDIRECT_URI`: callback URI (default `https://localhost`)
    /// - `VK_AUTH_URL`, `VK_TOKEN_URL`, `VK_USERINFO_URL`: endpoint overrides
    /// - `VK_SCOPES`: comma-separated scopes (default `email,phone`)
    /// - `SECRET_KEY`: session cookie key material; absent means an ephemeral key
    /// - `DEV_INSECURE_COOKIES`: `"1"` or `"true"` drops the `Secure` cookie flag
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or URLs are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let client_id = required_env("VK_CLIENT_ID")?;
        let client_secret = required_env("VK_CLIENT_SECRET")?;
        let redirect_uri = match std::env::var("VK_REDIRECT_URI") {
            Ok(s) => parse_url("VK_REDIRECT_URI", &s)?,
            Err(_) => parse_url("VK_REDIRECT_URI", DEFAULT_REDIRECT_URI)?,
        };

        let mut config = OAuthConfig::new(client_id, client_secret, redirect_uri);

        if let Ok(s) = std::env::var("VK_AUTH_URL") {
            config = config.with_auth_url(parse_url("VK_AUTH_URL", &s)?);
        }
        if let Ok(s) = std::env::var("VK_TOKEN_URL") {
            config = config.with_token_url(parse_url("VK_TOKEN_URL", &s)?);
        }
        if let Ok(s) = std::env::var("VK_USERINFO_URL") {
            config = config.with_userinfo_url(parse_url("VK_USERINFO_URL", &s)?);
        }
        if let Ok(scopes) = std::env::var("VK_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        let insecure = matches!(
            std::env::var("DEV_INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true"),
        );

        let cookie_key = match std::env::var("SECRET_KEY") {
            Ok(secret) if !secret.is_empty() => cookie_key_from_secret(&secret)?,
            _ => {
                tracing::warn!("SECRET_KEY not set; sessions will not survive a restart");
                Key::generate()
            }
        };

        tracing::info!(
            client_id = %config.client_id(),
            redirect_uri = %config.redirect_uri(),
            secure_cookies = !insecure,
            "Gateway configured"
        );

        Ok(Self::new(AuthClient::new(config))
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!insecure))
    }
}

/// Uses the secret directly when it is long enough, otherwise stretches it with SHA-512.
pub(crate) fn cookie_key_from_secret(secret: &str) -> Result<Key, AuthError> {
    let bytes = secret.as_bytes();
    let key = if bytes.len() >= 64 {
        Key::try_from(bytes)
    } else {
        Key::try_from(Sha512::digest(bytes).as_slice())
    };
    key.map_err(|_| AuthError::Config("SECRET_KEY cannot be used as a cookie key".into()))
}

fn required_env(name: &str) -> Result<String, AuthError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AuthError::Config(format!("{name} is required")))
}

fn parse_url(name: &str, value: &str) -> Result<Url, AuthError> {
    value
        .parse()
        .map_err(|e| AuthError::Config(format!("{name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_secret_is_stretched_deterministically() {
        let a = cookie_key_from_secret("random_string").unwrap();
        let b = cookie_key_from_secret("random_string").unwrap();
        let c = cookie_key_from_secret("another").unwrap();
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }

    #[test]
    fn long_secret_is_used_as_is() {
        let secret = "k".repeat(64);
        let key = cookie_key_from_secret(&secret).unwrap();
        assert_eq!(key.master(), secret.as_bytes());
    }

    #[test]
    fn invalid_url_is_a_config_error() {
        let err = parse_url("VK_TOKEN_URL", "not a url").unwrap_err();
        assert!(matches!(err, AuthError::Config(ref m) if m.starts_with("VK_TOKEN_URL")));
    }

    #[test]
    fn builder_overrides() {
        let config = GatewayConfig::new(())
            .with_session_cookie_name("custom")
            .with_session_ttl_days(1)
            .with_secure_cookies(false);
        assert_eq!(config.settings.session_cookie_name, "custom");
        assert_eq!(config.settings.session_ttl_days, 1);
        assert!(!config.settings.secure_cookies);
    }
}
