use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use url::Url;

use crate::compliance::{self, ProviderPayload};
use crate::error::Error;
use crate::pkce;

/// VK ID `OAuth2` configuration.
///
/// Required fields are constructor parameters, so there are no runtime "missing field" errors.
///
/// ```rust,ignore
/// use gradebook_gate::OAuthConfig;
///
/// let config = OAuthConfig::new("client-id", "client-secret", "https://localhost".parse()?)
///     .with_scopes(vec!["email".into()]);
/// ```
#[derive(Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) userinfo_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("userinfo_url", &self.userinfo_url.as_str())
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl OAuthConfig {
    /// Create a configuration pointing at the VK ID endpoints.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri,
            auth_url: "https://id.vk.ru/authorize"
                .parse()
                .expect("valid default URL"),
            token_url: "https://id.vk.ru/oauth2/auth"
                .parse()
                .expect("valid default URL"),
            userinfo_url: "https://id.vk.ru/oauth2/user_info"
                .parse()
                .expect("valid default URL"),
            scopes: vec!["email".into(), "phone".into()],
        }
    }

    /// Override the authorize endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    /// Override the user-info endpoint.
    #[must_use]
    pub fn with_userinfo_url(mut self, url: Url) -> Self {
        self.userinfo_url = url;
        self
    }

    /// Override the requested scopes (default: `["email", "phone"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Client identifier sent with every provider call.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authorize endpoint the browser is redirected to.
    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Token endpoint used for the code exchange.
    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// User-info endpoint.
    #[must_use]
    pub fn userinfo_url(&self) -> &Url {
        &self.userinfo_url
    }

    /// Callback URL registered with the provider.
    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    /// Requested scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// `OAuth2` authorization-code client for VK ID.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

/// What the browser needs to carry through the provider redirect.
///
/// Held in a short-lived private cookie between `/login` and the callback,
/// never on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_verifier: String,
}

/// Authorize URL plus the PKCE state that goes with it.
#[non_exhaustive]
pub struct AuthorizationRequest {
    pub url: String,
    pub pending: PendingAuthorization,
}

impl AuthorizationRequest {
    #[must_use]
    pub fn new(url: impl Into<String>, pending: PendingAuthorization) -> Self {
        Self {
            url: url.into(),
            pending,
        }
    }
}

/// Everything the callback delivered for one code exchange.
#[derive(Debug, Clone, Default)]
pub struct CodeGrant {
    pub code: String,
    /// `state` echoed back by the provider.
    pub state: Option<String>,
    /// PKCE state issued at `/login`, if the browser still has it.
    pub pending: Option<PendingAuthorization>,
    /// Provider-specific parameters (e.g. `device_id`), forwarded verbatim.
    pub extra_params: Vec<(String, String)>,
}

/// Token endpoint response. Used once for the user-info call, then dropped.
#[derive(Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            expires_in: None,
        }
    }
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Profile fields of the user-info response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// User-info response: `{ "user": { "email", "first_name", "last_name" } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfoEnvelope {
    #[serde(default)]
    pub user: Option<ProviderUser>,
}

impl UserInfoEnvelope {
    #[must_use]
    pub fn new(user: ProviderUser) -> Self {
        Self { user: Some(user) }
    }

    /// Reads the envelope out of a normalized payload.
    ///
    /// Raw payloads and payloads whose shape does not match yield an empty
    /// envelope; this never fails.
    #[must_use]
    pub fn from_payload(payload: &ProviderPayload) -> Self {
        let Some(user) = payload.field("user").filter(|u| u.is_object()) else {
            return Self::default();
        };
        // Field by field, so one mistyped field does not hide the others.
        let text = |key: &str| {
            user.get(key)
                .and_then(JsonValue::as_str)
                .map(str::to_owned)
        };
        Self::new(ProviderUser {
            email: text("email"),
            first_name: text("first_name"),
            last_name: text("last_name"),
        })
    }

    /// Verified email, if present and non-blank.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.user
            .as_ref()
            .and_then(|u| u.email.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Builds the provider's authorize URL for a given `state` and S256 challenge.
    #[must_use]
    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> Url {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", pkce::CODE_CHALLENGE_METHOD);
        url
    }

    /// Generates a fresh state nonce and PKCE verifier and the matching authorize URL.
    #[must_use]
    pub fn authorization_request(&self) -> AuthorizationRequest {
        let state = pkce::generate_state();
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::generate_code_challenge(&code_verifier);
        let url = self.authorize_url(&state, &code_challenge);

        AuthorizationRequest {
            url: url.into(),
            pending: PendingAuthorization {
                state,
                code_verifier,
            },
        }
    }

    /// Exchanges an authorization code for a token (`client_secret_post`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exchange`] on a state mismatch or a provider error
    /// payload, and [`Error::Http`] on network failure.
    pub async fn exchange_code(&self, grant: &CodeGrant) -> Result<TokenResponse, Error> {
        const OPERATION: &str = "token exchange";

        let pending = grant
            .pending
            .as_ref()
            .ok_or_else(|| Error::exchange(OPERATION, "no pending authorization for this browser"))?;
        let returned_state = grant
            .state
            .as_deref()
            .ok_or_else(|| Error::exchange(OPERATION, "state missing from callback"))?;
        if !pkce::state_matches(&pending.state, returned_state) {
            return Err(Error::exchange(OPERATION, "state mismatch"));
        }

        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", grant.code.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code_verifier", pending.code_verifier.as_str()),
            ("state", returned_state),
        ];
        params.extend(
            grant
                .extra_params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        let response = self
            .http
            .post(self.config.token_url.clone())
            .form(&params)
            .send()
            .await?;

        let payload = Self::read_payload(response, OPERATION).await?;
        token_from_payload(&payload)
    }

    /// Fetches the user-info envelope with a freshly obtained token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Exchange`] if the provider reports an error, and
    /// [`Error::Http`] on network failure. A body without usable fields is
    /// not an error; it yields an empty envelope.
    pub async fn fetch_user_info(&self, token: &TokenResponse) -> Result<UserInfoEnvelope, Error> {
        const OPERATION: &str = "userinfo request";

        let response = self
            .http
            .get(self.config.userinfo_url.clone())
            .bearer_auth(&token.access_token)
            .query(&[("client_id", self.config.client_id.as_str())])
            .send()
            .await?;

        let payload = Self::read_payload(response, OPERATION).await?;
        if let Some(detail) = provider_error(&payload) {
            return Err(Error::exchange(OPERATION, detail));
        }
        Ok(UserInfoEnvelope::from_payload(&payload))
    }

    /// Checks the HTTP status and runs the body through the compliance normalizer.
    async fn read_payload(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<ProviderPayload, Error> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(
                operation,
                status = status.as_u16(),
                body = %body,
                "Identity provider returned an error status"
            );
            return Err(Error::Exchange {
                operation,
                status: Some(status.as_u16()),
                detail: error_summary(&body),
            });
        }
        Ok(compliance::normalize_body(&body))
    }
}

const SUMMARY_MAX_CHARS: usize = 200;

/// One-line description of an error body, short enough to show a user.
/// Prefers the provider's `error` fields; otherwise the collapsed, truncated text.
fn error_summary(body: &str) -> String {
    let text = provider_error(&compliance::normalize_body(body))
        .unwrap_or_else(|| body.split_whitespace().collect::<Vec<_>>().join(" "));
    if text.is_empty() {
        return "empty response".into();
    }
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text;
    }
    let mut short: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
    short.push_str("...");
    short
}

/// `error` / `error_description` carried in an otherwise successful response.
fn provider_error(payload: &ProviderPayload) -> Option<String> {
    let error = payload.field("error")?;
    let description = payload
        .field("error_description")
        .and_then(JsonValue::as_str);
    let code = error
        .as_str()
        .map_or_else(|| error.to_string(), str::to_owned);
    Some(match description {
        Some(desc) => format!("{code}: {desc}"),
        None => code,
    })
}

fn token_from_payload(payload: &ProviderPayload) -> Result<TokenResponse, Error> {
    const OPERATION: &str = "token exchange";

    if let Some(detail) = provider_error(payload) {
        return Err(Error::exchange(OPERATION, detail));
    }
    let map = payload
        .as_object()
        .ok_or_else(|| Error::exchange(OPERATION, "unreadable token response"))?;
    serde_json::from_value(JsonValue::Object(map.clone()))
        .map_err(|e| Error::exchange(OPERATION, format!("unexpected token response: {e}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_config() -> OAuthConfig {
        OAuthConfig::new(
            "test-client",
            "test-secret",
            "https://localhost".parse().unwrap(),
        )
    }

    #[test]
    fn authorization_url_contains_pkce() {
        let client = AuthClient::new(test_config());
        let req = client.authorization_request();

        assert!(req.url.starts_with("https://id.vk.ru/authorize?"));
        assert!(req.url.contains("response_type=code"));
        assert!(req.url.contains("client_id=test-client"));
        assert!(req.url.contains("scope=email+phone"));
        assert!(req.url.contains("code_challenge="));
        assert!(req.url.contains("code_challenge_method=S256"));
        assert!(req.url.contains(&format!("state={}", req.pending.state)));
        assert!(!req.url.contains("test-secret"));
    }

    #[test]
    fn authorization_request_unique_per_call() {
        let client = AuthClient::new(test_config());
        let req1 = client.authorization_request();
        let req2 = client.authorization_request();

        assert_ne!(req1.pending.state, req2.pending.state);
        assert_ne!(req1.pending.code_verifier, req2.pending.code_verifier);
    }

    #[test]
    fn config_overrides() {
        let config = test_config()
            .with_auth_url("https://idp.example.com/authorize".parse().unwrap())
            .with_scopes(vec!["email".into()]);

        assert_eq!(config.auth_url().as_str(), "https://idp.example.com/authorize");
        assert_eq!(config.token_url().as_str(), "https://id.vk.ru/oauth2/auth");
        assert_eq!(config.scopes(), &["email"]);
        assert!(!format!("{config:?}").contains("test-secret"));
    }

    #[test]
    fn envelope_reads_user_fields() {
        let payload = ProviderPayload::Structured(json!({
            "user": {"email": "a@b.com", "first_name": "A", "last_name": "B", "phone": "7900"}
        }));
        let envelope = UserInfoEnvelope::from_payload(&payload);

        assert_eq!(envelope.email(), Some("a@b.com"));
        let user = envelope.user.unwrap();
        assert_eq!(user.first_name.as_deref(), Some("A"));
        assert_eq!(user.last_name.as_deref(), Some("B"));
    }

    #[test]
    fn envelope_degrades_without_failing() {
        let raw = UserInfoEnvelope::from_payload(&ProviderPayload::Raw("oops".into()));
        assert_eq!(raw, UserInfoEnvelope::default());

        let wrong_shape =
            UserInfoEnvelope::from_payload(&ProviderPayload::Structured(json!({"user": "x"})));
        assert_eq!(wrong_shape.email(), None);

        let mistyped = UserInfoEnvelope::from_payload(&ProviderPayload::Structured(
            json!({"user": {"email": 42, "first_name": "A"}}),
        ));
        assert_eq!(mistyped.email(), None);
        assert_eq!(mistyped.user.unwrap().first_name.as_deref(), Some("A"));
    }

    #[test]
    fn blank_email_is_absent() {
        let envelope = UserInfoEnvelope::new(ProviderUser {
            email: Some("   ".into()),
            ..ProviderUser::default()
        });
        assert_eq!(envelope.email(), None);
    }

    #[test]
    fn token_payload_error_field_is_a_provider_error() {
        let payload = ProviderPayload::Structured(json!({
            "error": "invalid_grant",
            "error_description": "code expired"
        }));
        let err = token_from_payload(&payload).unwrap_err();
        assert!(err.to_string().contains("invalid_grant: code expired"));
    }

    #[test]
    fn token_payload_raw_is_rejected() {
        let err = token_from_payload(&ProviderPayload::Raw("<html>".into())).unwrap_err();
        assert!(matches!(err, Error::Exchange { status: None, .. }));
    }

    #[test]
    fn token_payload_is_parsed() {
        let payload = ProviderPayload::Structured(json!({
            "access_token": "tok",
            "token_type": "Bearer",
            "expires_in": 3600,
            "user_id": 1
        }));
        let token = token_from_payload(&payload).unwrap();
        assert_eq!(token.access_token, "tok");
        assert_eq!(token.expires_in, Some(3600));
        assert!(format!("{token:?}").contains("<redacted>"));
    }

    #[test]
    fn error_summary_is_short_and_single_line() {
        assert_eq!(
            error_summary(r#"{"error":"invalid_client","error_description":"bad secret"}"#),
            "invalid_client: bad secret"
        );
        assert_eq!(error_summary(""), "empty response");

        let page = format!("<html>\n  <body>\n{}</body>\n</html>", "x".repeat(5000));
        let summary = error_summary(&page);
        assert!(!summary.contains('\n'));
        assert!(summary.starts_with("<html> <body> xxx"));
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS + 3);
    }

    #[tokio::test]
    async fn exchange_rejects_state_mismatch_without_calling_provider() {
        // Unroutable token URL: reaching the network would surface as Error::Http.
        let client = AuthClient::new(
            test_config().with_token_url("http://127.0.0.1:9/token".parse().unwrap()),
        );
        let grant = CodeGrant {
            code: "abc".into(),
            state: Some("other".into()),
            pending: Some(PendingAuthorization {
                state: "issued".into(),
                code_verifier: "v".into(),
            }),
            extra_params: vec![],
        };

        let err = client.exchange_code(&grant).await.unwrap_err();
        assert!(matches!(err, Error::Exchange { .. }));
        assert!(err.to_string().contains("state mismatch"));
    }

    #[tokio::test]
    async fn exchange_without_pending_authorization_fails() {
        let client = AuthClient::new(test_config());
        let grant = CodeGrant {
            code: "abc".into(),
            state: Some("s".into()),
            ..CodeGrant::default()
        };

        let err = client.exchange_code(&grant).await.unwrap_err();
        assert!(matches!(err, Error::Exchange { .. }));
    }

    mod against_stub_provider {
        use std::collections::HashMap;

        use axum::extract::Query;
        use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
        use axum::routing::{get, post};
        use axum::{Form, Router};

        use super::*;

        /// Serves the token and user-info endpoints, double-encoding both bodies.
        async fn spawn_provider() -> Url {
            async fn token(Form(form): Form<HashMap<String, String>>) -> (StatusCode, String) {
                let expected = [
                    ("grant_type", "authorization_code"),
                    ("code", "abc123"),
                    ("client_id", "test-client"),
                    ("client_secret", "test-secret"),
                    ("code_verifier", "verifier"),
                    ("state", "nonce"),
                    ("device_id", "dev-42"),
                ];
                if expected
                    .iter()
                    .any(|(k, v)| form.get(*k).map(String::as_str) != Some(*v))
                {
                    let body = json!({"error": "invalid_request"}).to_string();
                    return (StatusCode::BAD_REQUEST, body);
                }
                let inner = json!({"access_token": "tok-1", "token_type": "Bearer"}).to_string();
                (StatusCode::OK, serde_json::to_string(&inner).unwrap())
            }

            async fn user_info(
                headers: HeaderMap,
                Query(query): Query<HashMap<String, String>>,
            ) -> (StatusCode, String) {
                let bearer = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
                if bearer != Some("Bearer tok-1")
                    || query.get("client_id").map(String::as_str) != Some("test-client")
                {
                    return (StatusCode::UNAUTHORIZED, "denied".into());
                }
                let inner = json!({
                    "user": {"email": "a@b.com", "first_name": "A", "last_name": "B"}
                })
                .to_string();
                (StatusCode::OK, serde_json::to_string(&inner).unwrap())
            }

            let app = Router::new()
                .route("/oauth2/auth", post(token))
                .route("/oauth2/user_info", get(user_info));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{addr}/").parse().unwrap()
        }

        fn client_for(base: &Url) -> AuthClient {
            AuthClient::new(
                test_config()
                    .with_token_url(base.join("oauth2/auth").unwrap())
                    .with_userinfo_url(base.join("oauth2/user_info").unwrap()),
            )
        }

        fn grant(code: &str) -> CodeGrant {
            CodeGrant {
                code: code.into(),
                state: Some("nonce".into()),
                pending: Some(PendingAuthorization {
                    state: "nonce".into(),
                    code_verifier: "verifier".into(),
                }),
                extra_params: vec![("device_id".into(), "dev-42".into())],
            }
        }

        #[tokio::test]
        async fn full_exchange_with_double_encoded_bodies() {
            let base = spawn_provider().await;
            let client = client_for(&base);

            let token = client.exchange_code(&grant("abc123")).await.unwrap();
            assert_eq!(token.access_token, "tok-1");

            let envelope = client.fetch_user_info(&token).await.unwrap();
            assert_eq!(envelope.email(), Some("a@b.com"));
        }

        #[tokio::test]
        async fn rejected_code_reports_status() {
            let base = spawn_provider().await;
            let client = client_for(&base);

            let err = client.exchange_code(&grant("wrong")).await.unwrap_err();
            let Error::Exchange { status, detail, .. } = err else {
                panic!("expected a provider rejection");
            };
            assert_eq!(status, Some(400));
            assert_eq!(detail, "invalid_request");
        }

        #[tokio::test]
        async fn bad_token_is_rejected_by_userinfo() {
            let base = spawn_provider().await;
            let client = client_for(&base);

            let err = client
                .fetch_user_info(&TokenResponse::new("forged"))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Exchange {
                    status: Some(401),
                    ..
                }
            ));
        }
    }
}
