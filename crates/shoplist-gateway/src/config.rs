//! Gateway configuration types.

use std::time::Duration;

use serde::Deserialize;

/// Configuration for the HTTP layer.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Header carrying the admin key on admin routes.
    #[serde(default = "GatewayConfig::default_admin_header")]
    pub admin_header: String,

    /// Also require a valid session token on admin routes.
    #[serde(default)]
    pub admin_requires_session: bool,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_body() -> usize {
        64 * 1024
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    fn default_admin_header() -> String {
        "x-api-key".to_string()
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            admin_header: Self::default_admin_header(),
            admin_requires_session: false,
        }
    }
}
