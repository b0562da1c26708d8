//! Process configuration, loaded once at startup. No hot reload.

use std::time::Duration;

/// Immutable gateway configuration, passed explicitly into app construction
/// rather than read from ambient globals.
///
/// `jwt_secret` is optional on purpose: a process missing it still boots (so
/// the health surface stays up) and every authenticated request reports the
/// misconfiguration as a generic internal error.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub jwt_secret: Option<String>,
    pub auth_service_url: String,
    pub product_service_url: String,
    /// Budget for the ownership lookup; a timeout fails open.
    pub lookup_timeout: Duration,
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt_secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            auth_service_url: env_or("AUTH_SERVICE_URL", "http://localhost:3003"),
            product_service_url: env_or("PRODUCT_SERVICE_URL", "http://localhost:3001"),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}
