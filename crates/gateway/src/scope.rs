//! Country (tenant) scope enforcement for mutating routes.
//!
//! This is the only pipeline stage that may suspend: modify/delete requests
//! against an existing resource trigger one read-only ownership lookup to the
//! service of record. A lookup that cannot be completed fails open; the
//! downstream service remains the authority on the mutation itself.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use omnigate_auth::{Identity, PermissionRule};
use omnigate_core::CountryId;

use crate::context::CorrelationId;

/// Outcome of asking the owning service who a resource belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Resolved; `None` means the resource carries no country attribution.
    Owner(Option<CountryId>),
    /// Non-success status, malformed payload, transport failure, or timeout.
    Unresolved,
}

/// Read-only ownership lookup against the service of record.
///
/// Implementations must not attach the caller's authorization headers: the
/// fetch is an unauthenticated, internal read. They must propagate the
/// correlation id.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    async fn resource_owner(&self, path: &str, correlation_id: &CorrelationId) -> LookupOutcome;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeDenial {
    /// Scoped route, non-privileged caller, no country on the identity.
    #[error("Forbidden — no country assigned to your account")]
    NoTenantAssigned,

    /// Create payload declares a country other than the caller's own.
    #[error("Forbidden — cannot create resources for another country")]
    CrossTenantCreate,

    /// Existing resource is owned by a country other than the caller's own.
    #[error("Forbidden — resource belongs to another country")]
    CrossTenantModify,
}

/// Enforce country scoping for a request already admitted by the route
/// authorizer.
///
/// `body` is the parsed JSON payload for create requests and is ignored for
/// every other method. `path` is the full request path without query string.
pub async fn enforce(
    rule: &PermissionRule,
    identity: &Identity,
    method: &str,
    path: &str,
    body: Option<&Value>,
    lookup: &dyn ResourceLookup,
    correlation_id: &CorrelationId,
) -> Result<(), ScopeDenial> {
    if !rule.country_scoped {
        return Ok(());
    }

    // Principal bypasses country scoping unconditionally.
    if identity.is_principal() {
        return Ok(());
    }

    let Some(caller_country) = identity.country_id.as_ref() else {
        tracing::warn!(
            user_id = %identity.user_id,
            "caller has no country assigned, denying scoped access"
        );
        return Err(ScopeDenial::NoTenantAssigned);
    };

    match method.to_ascii_uppercase().as_str() {
        "POST" => {
            if let Some(declared) = body.and_then(country_field) {
                if declared != *caller_country {
                    tracing::warn!(
                        user_id = %identity.user_id,
                        declared_country = %declared,
                        caller_country = %caller_country,
                        "attempt to create a resource for another country"
                    );
                    return Err(ScopeDenial::CrossTenantCreate);
                }
            }
            // No declared country defers to the caller's own.
            Ok(())
        }
        "PUT" | "PATCH" | "DELETE" => {
            // Without a recognizable resource id there is nothing to check.
            if !ends_in_resource_id(path) {
                return Ok(());
            }

            match lookup.resource_owner(path, correlation_id).await {
                LookupOutcome::Unresolved => {
                    tracing::error!(
                        %path,
                        correlation_id = %correlation_id,
                        "ownership lookup failed, allowing (fail-open)"
                    );
                    Ok(())
                }
                LookupOutcome::Owner(Some(owner)) if owner != *caller_country => {
                    tracing::warn!(
                        user_id = %identity.user_id,
                        resource_country = %owner,
                        caller_country = %caller_country,
                        "attempt to modify a resource from another country"
                    );
                    Err(ScopeDenial::CrossTenantModify)
                }
                LookupOutcome::Owner(_) => Ok(()),
            }
        }
        _ => Ok(()),
    }
}

/// The country field of a JSON object, under either the application-case or
/// the wire-case spelling.
pub(crate) fn country_field(value: &Value) -> Option<CountryId> {
    value
        .get("countryId")
        .or_else(|| value.get("country_id"))
        .and_then(Value::as_str)
        .map(CountryId::from)
}

/// Whether the trailing path segment is a canonical (hyphenated) UUID
/// literal, the only resource-id shape the catalog services emit.
fn ends_in_resource_id(path: &str) -> bool {
    match path.rsplit('/').find(|s| !s.is_empty()) {
        Some(last) => last.len() == 36 && Uuid::try_parse(last).is_ok(),
        None => false,
    }
}

/// Production lookup: unauthenticated internal GET against the owning
/// backend, carrying only the correlation id.
pub struct HttpResourceLookup {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpResourceLookup {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ResourceLookup for HttpResourceLookup {
    async fn resource_owner(&self, path: &str, correlation_id: &CorrelationId) -> LookupOutcome {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Correlation-Id", correlation_id.as_str())
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(%url, status = %r.status(), "ownership lookup returned non-success");
                return LookupOutcome::Unresolved;
            }
            Err(err) => {
                tracing::debug!(%url, error = %err, "ownership lookup transport failure");
                return LookupOutcome::Unresolved;
            }
        };

        match response.json::<Value>().await {
            Ok(resource) => LookupOutcome::Owner(country_field(&resource)),
            Err(err) => {
                tracing::debug!(%url, error = %err, "ownership lookup payload was not JSON");
                LookupOutcome::Unresolved
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omnigate_auth::{PermissionRegistry, Role, roles};
    use serde_json::json;

    const RESOURCE: &str = "/api/country-products/550e8400-e29b-41d4-a716-446655440000";

    struct StubLookup(LookupOutcome);

    #[async_trait]
    impl ResourceLookup for StubLookup {
        async fn resource_owner(&self, _path: &str, _cid: &CorrelationId) -> LookupOutcome {
            self.0.clone()
        }
    }

    /// Lookup that panics if consulted; for paths that must not trigger one.
    struct NoLookup;

    #[async_trait]
    impl ResourceLookup for NoLookup {
        async fn resource_owner(&self, path: &str, _cid: &CorrelationId) -> LookupOutcome {
            panic!("unexpected ownership lookup for {path}");
        }
    }

    fn scoped_rule(method: &str, path: &str) -> PermissionRule {
        PermissionRegistry::standard()
            .find_rule(method, path)
            .expect("rule must exist")
            .clone()
    }

    fn unscoped_rule() -> PermissionRule {
        PermissionRegistry::standard()
            .find_rule("GET", "/api/country-products")
            .expect("rule must exist")
            .clone()
    }

    fn tenant(country: Option<&str>) -> Identity {
        Identity {
            user_id: "u-1".into(),
            email: None,
            roles: vec![Role::new(roles::TENANT)],
            country_id: country.map(CountryId::from),
        }
    }

    fn principal() -> Identity {
        Identity {
            user_id: "u-0".into(),
            email: None,
            roles: vec![Role::new(roles::PRINCIPAL)],
            country_id: None,
        }
    }

    fn cid() -> CorrelationId {
        CorrelationId::new("test-correlation")
    }

    #[tokio::test]
    async fn unscoped_rule_is_never_checked() {
        let outcome = enforce(
            &unscoped_rule(),
            &tenant(Some("c-1")),
            "GET",
            "/api/country-products",
            None,
            &NoLookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn principal_bypasses_scoping_regardless_of_body() {
        let body = json!({ "countryId": "c-99" });
        let outcome = enforce(
            &scoped_rule("POST", "/api/country-products"),
            &principal(),
            "POST",
            "/api/country-products",
            Some(&body),
            &NoLookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn caller_without_country_is_denied_on_every_scoped_method() {
        for method in ["POST", "PUT", "PATCH", "DELETE"] {
            let path = if method == "POST" {
                "/api/country-products".to_string()
            } else {
                RESOURCE.to_string()
            };
            let outcome = enforce(
                &scoped_rule(method, &path),
                &tenant(None),
                method,
                &path,
                None,
                &NoLookup,
                &cid(),
            )
            .await;
            assert_eq!(outcome, Err(ScopeDenial::NoTenantAssigned), "{method}");
        }
    }

    #[tokio::test]
    async fn create_with_matching_country_is_allowed() {
        let body = json!({ "countryId": "c-1" });
        let outcome = enforce(
            &scoped_rule("POST", "/api/country-products"),
            &tenant(Some("c-1")),
            "POST",
            "/api/country-products",
            Some(&body),
            &NoLookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn create_for_another_country_is_denied() {
        for body in [
            json!({ "countryId": "c-other" }),
            json!({ "country_id": "c-other" }),
        ] {
            let outcome = enforce(
                &scoped_rule("POST", "/api/country-products"),
                &tenant(Some("c-1")),
                "POST",
                "/api/country-products",
                Some(&body),
                &NoLookup,
                &cid(),
            )
            .await;
            assert_eq!(outcome, Err(ScopeDenial::CrossTenantCreate));
        }
    }

    #[tokio::test]
    async fn create_without_declared_country_defers_to_the_callers_own() {
        let body = json!({ "price": 10 });
        let outcome = enforce(
            &scoped_rule("POST", "/api/country-products"),
            &tenant(Some("c-1")),
            "POST",
            "/api/country-products",
            Some(&body),
            &NoLookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn modify_with_matching_owner_is_allowed() {
        let lookup = StubLookup(LookupOutcome::Owner(Some(CountryId::from("c-1"))));
        let outcome = enforce(
            &scoped_rule("PUT", RESOURCE),
            &tenant(Some("c-1")),
            "PUT",
            RESOURCE,
            None,
            &lookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn modify_of_a_foreign_resource_is_denied() {
        let lookup = StubLookup(LookupOutcome::Owner(Some(CountryId::from("c-other"))));
        for method in ["PUT", "PATCH", "DELETE"] {
            let outcome = enforce(
                &scoped_rule(method, RESOURCE),
                &tenant(Some("c-1")),
                method,
                RESOURCE,
                None,
                &lookup,
                &cid(),
            )
            .await;
            assert_eq!(outcome, Err(ScopeDenial::CrossTenantModify), "{method}");
        }
    }

    #[tokio::test]
    async fn resource_without_attribution_is_allowed() {
        let lookup = StubLookup(LookupOutcome::Owner(None));
        let outcome = enforce(
            &scoped_rule("DELETE", RESOURCE),
            &tenant(Some("c-1")),
            "DELETE",
            RESOURCE,
            None,
            &lookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn unresolved_lookup_fails_open() {
        let lookup = StubLookup(LookupOutcome::Unresolved);
        let outcome = enforce(
            &scoped_rule("PUT", RESOURCE),
            &tenant(Some("c-1")),
            "PUT",
            RESOURCE,
            None,
            &lookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn non_uuid_trailing_segment_skips_the_lookup() {
        let path = "/api/country-products/not-a-uuid";
        let outcome = enforce(
            &scoped_rule("PUT", path),
            &tenant(Some("c-1")),
            "PUT",
            path,
            None,
            &NoLookup,
            &cid(),
        )
        .await;
        assert_eq!(outcome, Ok(()));
    }

    #[test]
    fn resource_id_recognition_requires_canonical_uuids() {
        assert!(ends_in_resource_id(RESOURCE));
        assert!(ends_in_resource_id(
            "/api/country-products/550E8400-E29B-41D4-A716-446655440000"
        ));
        assert!(!ends_in_resource_id("/api/country-products/123"));
        assert!(!ends_in_resource_id("/api/country-products"));
        // Simple (unhyphenated) form is not a canonical literal.
        assert!(!ends_in_resource_id(
            "/api/country-products/550e8400e29b41d4a716446655440000"
        ));
    }

    #[test]
    fn country_field_reads_both_spellings() {
        assert_eq!(
            country_field(&json!({ "countryId": "c-1" })),
            Some(CountryId::from("c-1"))
        );
        assert_eq!(
            country_field(&json!({ "country_id": "c-2" })),
            Some(CountryId::from("c-2"))
        );
        assert_eq!(country_field(&json!({ "name": "x" })), None);
        assert_eq!(country_field(&json!({ "countryId": 7 })), None);
    }
}
