//! Request-scoped context carried through axum extensions.

use std::sync::Arc;

use omnigate_auth::PermissionRule;

/// Correlation id for a request: the inbound `X-Correlation-Id` value, or a
/// freshly generated one. Echoed on every response and propagated to the
/// ownership lookup so cross-service failures stay diagnosable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The permission rule matched by the route authorizer, carried forward so
/// the scope stage and the forwarder never resolve it a second time.
#[derive(Debug, Clone)]
pub struct RoutePermission(pub Arc<PermissionRule>);
