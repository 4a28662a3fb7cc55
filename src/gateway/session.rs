use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use super::config::GatewaySettings;
use super::cookies;
use crate::oauth::UserInfoEnvelope;

const FIRST_NAME_PLACEHOLDER: &str = "Verified";
const LAST_NAME_PLACEHOLDER: &str = "User";
const DISPLAY_NAME_PLACEHOLDER: &str = "Administrator";

/// What the session cookie carries.
///
/// Invariant: an authorized session always has a non-empty display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    subject_display_name: String,
    is_authorized: bool,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authorized admin session. A blank name falls back to a placeholder.
    #[must_use]
    pub fn authorized(display_name: impl Into<String>) -> Self {
        let name = display_name.into();
        let name = if name.trim().is_empty() {
            DISPLAY_NAME_PLACEHOLDER.to_string()
        } else {
            name
        };
        Self {
            subject_display_name: name,
            is_authorized: true,
        }
    }

    /// Builds the session for a completed sign-in.
    ///
    /// `None` when the provider gave no usable email: that is an
    /// unauthenticated outcome, not an error. Missing names get placeholders.
    #[must_use]
    pub fn from_user_info(envelope: &UserInfoEnvelope) -> Option<Self> {
        if envelope.email().is_none() {
            return None;
        }

        let user = envelope.user.as_ref();
        let name_part = |part: Option<&String>, placeholder: &str| {
            part.map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .unwrap_or(placeholder)
                .to_string()
        };
        let first = name_part(user.and_then(|u| u.first_name.as_ref()), FIRST_NAME_PLACEHOLDER);
        let last = name_part(user.and_then(|u| u.last_name.as_ref()), LAST_NAME_PLACEHOLDER);

        Some(Self::authorized(format!("{first} {last}")))
    }

    #[must_use]
    pub fn is_authorized(&self) -> bool {
        self.is_authorized
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.subject_display_name.is_empty() {
            DISPLAY_NAME_PLACEHOLDER
        } else {
            &self.subject_display_name
        }
    }

    // Cookie contents that break the invariant are treated as anonymous.
    fn validated(self) -> Self {
        if self.is_authorized && self.subject_display_name.trim().is_empty() {
            Self::anonymous()
        } else {
            self
        }
    }
}

/// Reads the session. Absent, tampered or undecodable cookies yield an anonymous session.
pub(crate) fn load(jar: &PrivateCookieJar, settings: &GatewaySettings) -> Session {
    let Some(cookie) = jar.get(&settings.session_cookie_name) else {
        return Session::anonymous();
    };
    match serde_json::from_str::<Session>(cookie.value()) {
        Ok(session) => session.validated(),
        Err(e) => {
            tracing::debug!(error = %e, "Discarding unreadable session cookie");
            Session::anonymous()
        }
    }
}

pub(crate) fn store(
    jar: PrivateCookieJar,
    settings: &GatewaySettings,
    session: &Session,
) -> PrivateCookieJar {
    let value = cookies::encode_value(session);
    jar.add(cookies::session_cookie(
        &settings.session_cookie_name,
        value,
        settings.session_ttl_days,
        settings.secure_cookies,
    ))
}

pub(crate) fn clear(jar: PrivateCookieJar, settings: &GatewaySettings) -> PrivateCookieJar {
    jar.remove(cookies::clear_session_cookie(&settings.session_cookie_name))
}
