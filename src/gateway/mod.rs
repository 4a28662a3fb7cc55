//! Admin sign-in gateway and session-gated gradebook routes for Axum.
//!
//! The gateway is stateless per request: the only continuity between
//! requests is the private (encrypted and authenticated) session cookie.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use gradebook_gate::gateway::{GatewayConfig, gateway_routes};
//! use gradebook_gate::{HandlebarsRenderer, JsonGradebook};
//!
//! let config = GatewayConfig::from_env()?;
//! let gradebook = JsonGradebook::load("grades_data.json");
//! let app = gateway_routes(config, gradebook, HandlebarsRenderer::new()?);
//! ```
//!
//! Routes:
//! - `GET /login` redirects to the identity provider.
//! - `GET /` completes a sign-in (`?code=...`), forwards a signed-in admin
//!   to `/select_user`, or renders the sign-in page.
//! - `GET /logout` clears the session.
//! - `GET /select_user` and `GET /grades/{student_id}` require a signed-in admin.

mod config;
mod cookies;
mod error;
mod extractor;
mod routes;
mod session;
mod state;
mod traits;

pub use config::GatewayConfig;
pub use error::AuthError;
pub use extractor::{AdminSession, access_guard};
pub use routes::{LoginOutcome, PROTECTED_LANDING, PUBLIC_LANDING, complete_login, gateway_routes};
pub use session::Session;
pub use state::GatewayState;
pub use traits::{GradebookQuery, IdentityProvider, ViewRenderer};

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
