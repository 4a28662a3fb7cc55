use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

use super::routes::PUBLIC_LANDING;

/// Gateway errors that end a request without reaching a route body.
///
/// Sign-in failures are not here: they are rendered on the sign-in page.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No authorized session; the client is sent back to the public landing page.
    #[error("Not authorized")]
    Unauthorized,

    /// A page could not be rendered.
    #[error("Render error: {0}")]
    Render(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => Redirect::to(PUBLIC_LANDING).into_response(),
            Self::Render(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Gateway internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        match e {
            crate::error::Error::Config(msg) => Self::Config(msg),
            other => Self::Render(other.to_string()),
        }
    }
}
