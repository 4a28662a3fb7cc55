#![doc = include_str!("../README.md")]

pub mod compliance;
pub mod error;
pub mod gateway;
pub mod gradebook;
pub mod oauth;
pub mod pkce;
pub mod types;
pub mod views;

// Re-exports for convenient access
pub use compliance::{ProviderPayload, normalize};
pub use error::Error;
pub use gradebook::{GradeRecord, GradeStatus, JsonGradebook, grade_status, score_status};
pub use oauth::{
    AuthClient, AuthorizationRequest, CodeGrant, OAuthConfig, PendingAuthorization, ProviderUser,
    TokenResponse, UserInfoEnvelope,
};
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state};
pub use types::StudentId;
pub use views::{HandlebarsRenderer, View};
