use thiserror::Error;

use crate::{Identity, PermissionRegistry, PermissionRule};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// No rule covers this (method, path). Denial is the default.
    #[error("no permission rule matches {method} {path}")]
    NoRuleMatched { method: String, path: String },

    /// A rule matched but the caller holds none of its allowed roles.
    #[error("caller roles do not satisfy the matched rule")]
    InsufficientRole,
}

/// Resolve the permission rule for a request and check the caller's roles.
///
/// - No IO
/// - No panics
/// - Deny-by-default: absence of a rule is a denial, never an implicit allow
///
/// `path` must be the full request path with the query string removed; any
/// mount-prefix stripping done by an outer router has to be undone before
/// this stage, otherwise scoped sub-paths are silently under-matched.
///
/// On success the matched rule is returned so the tenant-scope stage can
/// consult its `country_scoped` flag without a second registry scan.
pub fn authorize<'a>(
    registry: &'a PermissionRegistry,
    identity: &Identity,
    method: &str,
    path: &str,
) -> Result<&'a PermissionRule, AuthzError> {
    let rule = registry
        .find_rule(method, path)
        .ok_or_else(|| AuthzError::NoRuleMatched {
            method: method.to_string(),
            path: path.to_string(),
        })?;

    let allowed = rule
        .allowed_roles
        .iter()
        .any(|required| identity.has_role(required.as_str()));

    if allowed { Ok(rule) } else { Err(AuthzError::InsufficientRole) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, roles};
    use proptest::prelude::*;

    fn identity(role_names: &[&'static str]) -> Identity {
        Identity {
            user_id: "user-1".into(),
            email: None,
            roles: role_names.iter().map(|r| Role::new(*r)).collect(),
            country_id: None,
        }
    }

    #[test]
    fn unmatched_route_is_denied_by_default() {
        let registry = PermissionRegistry::standard();
        let err = authorize(
            &registry,
            &identity(&[roles::PRINCIPAL]),
            "DELETE",
            "/api/unknown-route",
        )
        .unwrap_err();
        assert!(matches!(err, AuthzError::NoRuleMatched { .. }));
    }

    #[test]
    fn caller_without_a_required_role_is_denied() {
        let registry = PermissionRegistry::standard();
        let err = authorize(
            &registry,
            &identity(&[roles::USER]),
            "POST",
            "/api/countries",
        )
        .unwrap_err();
        assert_eq!(err, AuthzError::InsufficientRole);
    }

    #[test]
    fn caller_with_one_allowed_role_is_admitted() {
        let registry = PermissionRegistry::standard();
        let rule = authorize(
            &registry,
            &identity(&[roles::PRINCIPAL]),
            "POST",
            "/api/countries",
        )
        .unwrap();
        assert!(!rule.country_scoped);
    }

    #[test]
    fn admitted_decision_carries_the_scoped_flag_forward() {
        let registry = PermissionRegistry::standard();
        let rule = authorize(
            &registry,
            &identity(&[roles::TENANT]),
            "PUT",
            "/api/country-products/550e8400-e29b-41d4-a716-446655440000",
        )
        .unwrap();
        assert!(rule.country_scoped);
    }

    #[test]
    fn extra_unrelated_roles_do_not_help() {
        let registry = PermissionRegistry::standard();
        let err = authorize(
            &registry,
            &identity(&["Auditor", "Billing"]),
            "POST",
            "/api/products",
        )
        .unwrap_err();
        assert_eq!(err, AuthzError::InsufficientRole);
    }

    proptest! {
        // A caller with zero roles is valid but fails every check.
        #[test]
        fn empty_role_set_never_authorizes(
            method in prop::sample::select(vec!["GET", "POST", "PUT", "PATCH", "DELETE"]),
            path in "/api/[a-z-]{1,20}(/[a-z0-9-]{1,20}){0,2}",
        ) {
            let registry = PermissionRegistry::standard();
            prop_assert!(authorize(&registry, &identity(&[]), method, &path).is_err());
        }
    }
}
