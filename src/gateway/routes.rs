use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;

use super::config::GatewayConfig;
use super::cookies;
use super::error::AuthError;
use super::extractor::AdminSession;
use super::session::{self, Session};
use super::state::GatewayState;
use super::traits::{GradebookQuery, IdentityProvider, ViewRenderer};
use crate::error::Error;
use crate::oauth::CodeGrant;
use crate::types::StudentId;
use crate::views::View;

/// Where anonymous clients land and where denied requests are sent.
pub const PUBLIC_LANDING: &str = "/";
/// Where a signed-in admin lands.
pub const PROTECTED_LANDING: &str = "/select_user";

/// Callback query parameters forwarded verbatim to the token exchange.
const PASSTHROUGH_PARAMS: &[&str] = &["device_id"];

/// Create the gateway router with its state built once from the given parts.
pub fn gateway_routes<P, G, R>(config: GatewayConfig<P>, gradebook: G, renderer: R) -> Router
where
    P: IdentityProvider,
    G: GradebookQuery,
    R: ViewRenderer,
{
    let state = GatewayState {
        provider: Arc::new(config.provider),
        gradebook: Arc::new(gradebook),
        renderer: Arc::new(renderer),
        settings: config.settings,
    };

    Router::new()
        .route(PUBLIC_LANDING, get(home::<P, G, R>))
        .route("/login", get(login::<P, G, R>))
        .route("/logout", get(logout::<P, G, R>))
        .route(PROTECTED_LANDING, get(select_user::<P, G, R>))
        .route("/grades/{student_id}", get(grades::<P, G, R>))
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<P: IdentityProvider, G: GradebookQuery, R: ViewRenderer>(
    State(state): State<GatewayState<P, G, R>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    let auth_req = state.provider.authorization_request();
    let pending = cookies::pending_cookie(&auth_req.pending, state.settings.secure_cookies);

    tracing::debug!("Redirecting to identity provider");
    (jar.add(pending), Redirect::to(&auth_req.url))
}

// ── Landing / callback ─────────────────────────────────────────────

/// Result of a sign-in attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Token and user info obtained, with a verified email.
    Established(Session),
    /// The provider answered but gave no usable email. Not an error.
    Unverified,
    /// Exchange or user-info call failed.
    Failed(Error),
}

/// Sign-in parameters picked out of the callback query string.
#[derive(Debug, Default)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    extra: Vec<(String, String)>,
}

impl CallbackParams {
    fn from_query(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            if key == "code" {
                params.code = Some(value);
            } else if key == "state" {
                params.state = Some(value);
            } else if PASSTHROUGH_PARAMS.contains(&key.as_str()) {
                params.extra.push((key, value));
            }
        }
        params
    }
}

/// Exchange, then user info, strictly in that order. Never fails outright:
/// every failure becomes [`LoginOutcome::Failed`].
pub async fn complete_login<P: IdentityProvider>(provider: &P, grant: &CodeGrant) -> LoginOutcome {
    let token = match provider.exchange_code(grant).await {
        Ok(token) => token,
        Err(e) => {
            log_sign_in_failure("exchange", &e);
            return LoginOutcome::Failed(e);
        }
    };

    let envelope = match provider.fetch_user_info(&token).await {
        Ok(envelope) => envelope,
        Err(e) => {
            log_sign_in_failure("userinfo", &e);
            return LoginOutcome::Failed(e);
        }
    };
    drop(token);

    match Session::from_user_info(&envelope) {
        Some(session) => LoginOutcome::Established(session),
        None => LoginOutcome::Unverified,
    }
}

async fn home<P: IdentityProvider, G: GradebookQuery, R: ViewRenderer>(
    State(state): State<GatewayState<P, G, R>>,
    jar: PrivateCookieJar,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Response, AuthError> {
    let params = CallbackParams::from_query(query);

    let jar = match params.code {
        Some(code) => {
            let grant = CodeGrant {
                code,
                state: params.state,
                pending: cookies::get_pending(&jar),
                extra_params: params.extra,
            };
            // The PKCE state is single-use whatever happens next.
            let jar = jar.remove(cookies::clear_pending_cookie());

            match complete_login(state.provider.as_ref(), &grant).await {
                LoginOutcome::Established(session) => {
                    tracing::info!(admin = %session.display_name(), "Admin signed in");
                    let jar = session::store(jar, &state.settings, &session);
                    return Ok((jar, Redirect::to(PROTECTED_LANDING)).into_response());
                }
                LoginOutcome::Failed(e) => {
                    let body = state
                        .renderer
                        .render(&View::login_error(format!("Sign-in failed: {e}")))?;
                    return Ok((jar, Html(body)).into_response());
                }
                LoginOutcome::Unverified => {
                    tracing::info!("Provider returned no verified email; staying anonymous");
                    jar
                }
            }
        }
        None => jar,
    };

    if session::load(&jar, &state.settings).is_authorized() {
        return Ok((jar, Redirect::to(PROTECTED_LANDING)).into_response());
    }

    let body = state.renderer.render(&View::login())?;
    Ok((jar, Html(body)).into_response())
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<P: IdentityProvider, G: GradebookQuery, R: ViewRenderer>(
    State(state): State<GatewayState<P, G, R>>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if session::load(&jar, &state.settings).is_authorized() {
        tracing::info!("Admin signed out");
    }
    (
        session::clear(jar, &state.settings),
        Redirect::to(PUBLIC_LANDING),
    )
}

// ── Protected pages ────────────────────────────────────────────────

async fn select_user<P: IdentityProvider, G: GradebookQuery, R: ViewRenderer>(
    AdminSession(session): AdminSession,
    State(state): State<GatewayState<P, G, R>>,
) -> Result<Html<String>, AuthError> {
    let students = state.gradebook.list_students();
    let view = View::select_user(session.display_name(), students);
    Ok(Html(state.renderer.render(&view)?))
}

async fn grades<P: IdentityProvider, G: GradebookQuery, R: ViewRenderer>(
    AdminSession(session): AdminSession,
    State(state): State<GatewayState<P, G, R>>,
    Path(student_id): Path<String>,
) -> Result<Html<String>, AuthError> {
    let student_id = StudentId::from(student_id);
    let view = View::Grades {
        admin_name: session.display_name().to_string(),
        data: state.gradebook.grades_for(&student_id),
        student_name: student_id,
    };
    Ok(Html(state.renderer.render(&view)?))
}

// ── Helpers ────────────────────────────────────────────────────────

fn log_sign_in_failure(stage: &'static str, e: &Error) {
    match e {
        Error::Exchange {
            operation,
            status,
            detail,
        } => tracing::warn!(
            stage,
            operation = %operation,
            status = ?status,
            detail = %detail,
            "Identity provider rejected sign-in"
        ),
        Error::Http(err) => {
            tracing::error!(stage, error = %err, "Identity provider unreachable");
        }
        other => tracing::error!(stage, error = %other, "Sign-in failed"),
    }
}
