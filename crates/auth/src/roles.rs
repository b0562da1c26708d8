use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role that bypasses all tenant (country) scoping.
pub const PRINCIPAL: &str = "Principal";

/// Role whose writes are scoped to the caller's own country.
pub const TENANT: &str = "Tenant";

/// Read-mostly role with no write access to scoped resources.
pub const USER: &str = "User";

/// Role identifier used for RBAC.
///
/// Roles are intentionally opaque strings at this layer; the well-known names
/// above are the ones the standard rule table refers to, but the registry
/// accepts any role name the auth service chooses to mint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_principal(&self) -> bool {
        self.0 == PRINCIPAL
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
