use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::PrivateCookieJar;
use axum_extra::extract::cookie::Key;

use super::error::AuthError;
use super::session::{self, Session};
use super::state::GatewayState;
use super::traits::{GradebookQuery, IdentityProvider, ViewRenderer};

/// Passes authorized sessions through and turns everything else away.
///
/// # Errors
///
/// Returns [`AuthError::Unauthorized`] (a redirect to `/`) unless the session is authorized.
pub fn access_guard(session: Session) -> Result<Session, AuthError> {
    if session.is_authorized() {
        Ok(session)
    } else {
        Err(AuthError::Unauthorized)
    }
}

/// Authorized admin session extracted from the session cookie.
///
/// Use as the first extractor of every protected handler. Requests without an
/// authorized session are redirected to `/` before the handler body runs.
///
/// ```rust,ignore
/// async fn protected(AdminSession(session): AdminSession) -> String {
///     format!("Hello, {}", session.display_name())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

impl<P, G, R> FromRequestParts<GatewayState<P, G, R>> for AdminSession
where
    P: IdentityProvider,
    G: GradebookQuery,
    R: ViewRenderer,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState<P, G, R>,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> = PrivateCookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthorized)?;

        let session = session::load(&jar, &state.settings);
        if !session.is_authorized() {
            tracing::debug!(path = %parts.uri.path(), "Access denied without authorized session");
        }
        access_guard(session).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_passes_authorized_session() {
        let session = access_guard(Session::authorized("A B")).unwrap();
        assert_eq!(session.display_name(), "A B");
    }

    #[test]
    fn guard_denies_unauthorized_session_even_with_a_name() {
        let named: Session =
            serde_json::from_str(r#"{"subject_display_name":"A B","is_authorized":false}"#)
                .unwrap();
        assert!(matches!(access_guard(named), Err(AuthError::Unauthorized)));
        assert!(matches!(
            access_guard(Session::anonymous()),
            Err(AuthError::Unauthorized)
        ));
    }
}
