use serde::{Deserialize, Serialize};

use omnigate_core::{CountryId, UserId};

use crate::{Role, roles};

/// Identity of an authenticated caller.
///
/// Built fresh per request from verified token claims, never persisted by the
/// gateway, and immutable once constructed. A caller with zero roles is a
/// valid identity; it will simply fail every downstream authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    pub country_id: Option<CountryId>,
}

impl Identity {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == name)
    }

    /// Principal is the global-admin role: it bypasses country scoping.
    pub fn is_principal(&self) -> bool {
        self.has_role(roles::PRINCIPAL)
    }
}
