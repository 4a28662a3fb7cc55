use std::future::Future;

use crate::error::Error;
use crate::gradebook::{GradeRecord, JsonGradebook};
use crate::oauth::{AuthClient, AuthorizationRequest, CodeGrant, TokenResponse, UserInfoEnvelope};
use crate::types::StudentId;
use crate::views::{HandlebarsRenderer, View};

/// The external identity provider, as the gateway sees it.
///
/// [`AuthClient`] is the production implementation; tests substitute stubs.
/// Both calls surface every failure (transport or provider-reported) as an
/// [`Error`]; the gateway does not distinguish them when responding.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Fresh authorize URL with a new state nonce and PKCE verifier.
    fn authorization_request(&self) -> AuthorizationRequest;

    /// Exchange the callback's code for a token.
    fn exchange_code(
        &self,
        grant: &CodeGrant,
    ) -> impl Future<Output = Result<TokenResponse, Error>> + Send;

    /// Fetch the normalized user-info envelope for a token.
    fn fetch_user_info(
        &self,
        token: &TokenResponse,
    ) -> impl Future<Output = Result<UserInfoEnvelope, Error>> + Send;
}

impl IdentityProvider for AuthClient {
    fn authorization_request(&self) -> AuthorizationRequest {
        AuthClient::authorization_request(self)
    }

    async fn exchange_code(&self, grant: &CodeGrant) -> Result<TokenResponse, Error> {
        AuthClient::exchange_code(self, grant).await
    }

    async fn fetch_user_info(&self, token: &TokenResponse) -> Result<UserInfoEnvelope, Error> {
        AuthClient::fetch_user_info(self, token).await
    }
}

/// Read-only access to student grade records.
pub trait GradebookQuery: Send + Sync + 'static {
    /// Student identifiers in display order.
    fn list_students(&self) -> Vec<StudentId>;

    /// Grades with derived status; a single placeholder row for unknown students.
    fn grades_for(&self, student_id: &StudentId) -> Vec<GradeRecord>;
}

impl GradebookQuery for JsonGradebook {
    fn list_students(&self) -> Vec<StudentId> {
        JsonGradebook::list_students(self)
    }

    fn grades_for(&self, student_id: &StudentId) -> Vec<GradeRecord> {
        JsonGradebook::grades_for(self, student_id)
    }
}

/// Turns a [`View`] into a response body.
pub trait ViewRenderer: Send + Sync + 'static {
    fn render(&self, view: &View) -> Result<String, Error>;
}

impl ViewRenderer for HandlebarsRenderer {
    fn render(&self, view: &View) -> Result<String, Error> {
        self.render_html(view)
    }
}
