use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::GatewaySettings;
use super::traits::{GradebookQuery, IdentityProvider, ViewRenderer};

/// Shared, read-only state for gateway route handlers.
///
/// Built once at startup by [`gateway_routes`](super::gateway_routes).
pub struct GatewayState<P, G, R> {
    pub(super) provider: Arc<P>,
    pub(super) gradebook: Arc<G>,
    pub(super) renderer: Arc<R>,
    pub(crate) settings: GatewaySettings,
}

// Manual Clone: avoid derive adding `P: Clone, G: Clone, R: Clone` bounds.
impl<P, G, R> Clone for GatewayState<P, G, R> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            gradebook: self.gradebook.clone(),
            renderer: self.renderer.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<P, G, R> FromRef<GatewayState<P, G, R>> for Key
where
    P: IdentityProvider,
    G: GradebookQuery,
    R: ViewRenderer,
{
    fn from_ref(state: &GatewayState<P, G, R>) -> Self {
        state.settings.cookie_key.clone()
    }
}
