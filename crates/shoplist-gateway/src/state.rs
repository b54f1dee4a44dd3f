//! Gateway application state.

use std::sync::Arc;

use shoplist_auth::AuthService;
use shoplist_store::UserDirectory;

use crate::config::GatewayConfig;

/// State shared by every handler and middleware.
pub type SharedState<D> = Arc<GatewayState<D>>;

/// Shared application state for the gateway.
pub struct GatewayState<D: UserDirectory> {
    /// The authentication core.
    pub auth: Arc<AuthService<D>>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<D: UserDirectory> GatewayState<D> {
    /// Create a new gateway state.
    #[must_use]
    pub fn new(auth: Arc<AuthService<D>>, config: GatewayConfig) -> Self {
        Self { auth, config }
    }
}

impl<D: UserDirectory> Clone for GatewayState<D> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            config: self.config.clone(),
        }
    }
}
