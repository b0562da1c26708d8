//! Declarative route permission table.
//!
//! Deny-by-default: a (method, path) pair with no matching rule is denied.
//! Rules are static configuration, built once at process start and immutable
//! thereafter; the *first* matching rule wins, so the table must be authored
//! without ambiguous overlaps for the same method and path.

use std::borrow::Cow;

use crate::{Role, roles};

/// Method selector for a rule (`Any` is the `*` wildcard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodMatch {
    Any,
    Is(Cow<'static, str>),
}

impl MethodMatch {
    pub fn matches(&self, method: &str) -> bool {
        match self {
            MethodMatch::Any => true,
            MethodMatch::Is(m) => m.eq_ignore_ascii_case(method),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Cow<'static, str>),
    /// Exactly one non-empty path segment.
    Param,
}

/// Path matcher over normalized request paths (query string excluded).
///
/// Template syntax, segment by segment:
/// - a literal (`api`, `countries`) matches itself
/// - `:name` matches exactly one non-empty segment
/// - a trailing `/*` matches the base path itself or any subtree below it
///
/// A trailing slash on the request path is tolerated when the template ends
/// in a literal (collection routes) and rejected when it ends in `:name`
/// (item routes), mirroring how the route table is meant to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
    subtree: bool,
}

impl PathPattern {
    pub fn new(template: &'static str) -> Self {
        let (template, subtree) = match template.strip_suffix("/*") {
            Some(base) => (base, true),
            None => (template, false),
        };

        let segments = template
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with(':') {
                    Segment::Param
                } else {
                    Segment::Literal(Cow::Borrowed(s))
                }
            })
            .collect();

        Self { segments, subtree }
    }

    pub fn matches(&self, path: &str) -> bool {
        let trailing_slash = path.len() > 1 && path.ends_with('/');
        let mut parts = path.split('/').filter(|s| !s.is_empty());

        for segment in &self.segments {
            match (parts.next(), segment) {
                (Some(part), Segment::Literal(lit)) if part == lit => {}
                (Some(_), Segment::Param) => {}
                _ => return false,
            }
        }

        if self.subtree {
            return true;
        }
        if parts.next().is_some() {
            return false;
        }
        if trailing_slash && matches!(self.segments.last(), Some(Segment::Param)) {
            return false;
        }
        true
    }
}

/// A single (method, path) entry: who may call it, and whether writes are
/// scoped to the caller's own country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRule {
    pub method: MethodMatch,
    pub path: PathPattern,
    pub allowed_roles: Vec<Role>,
    pub country_scoped: bool,
}

/// Ordered, immutable rule table with first-match-wins lookup.
#[derive(Debug, Clone, Default)]
pub struct PermissionRegistry {
    rules: Vec<PermissionRule>,
}

impl PermissionRegistry {
    pub fn new(rules: Vec<PermissionRule>) -> Self {
        Self { rules }
    }

    /// First rule whose method and path both match, or `None` (deny).
    pub fn find_rule(&self, method: &str, path: &str) -> Option<&PermissionRule> {
        self.rules
            .iter()
            .find(|rule| rule.method.matches(method) && rule.path.matches(path))
    }

    /// The production rule table for the product-catalog surface.
    pub fn standard() -> Self {
        Self::new(vec![
            // Countries: only Principal administers them, everyone reads.
            rule("POST", "/api/countries", &[roles::PRINCIPAL], false),
            rule(
                "GET",
                "/api/countries/*",
                &[roles::PRINCIPAL, roles::TENANT, roles::USER],
                false,
            ),
            rule("PUT", "/api/countries/:id", &[roles::PRINCIPAL], false),
            rule("DELETE", "/api/countries/:id", &[roles::PRINCIPAL], false),
            // Products
            rule(
                "POST",
                "/api/products",
                &[roles::PRINCIPAL, roles::TENANT],
                false,
            ),
            rule(
                "GET",
                "/api/products/*",
                &[roles::PRINCIPAL, roles::TENANT, roles::USER],
                false,
            ),
            rule(
                "PUT",
                "/api/products/:id",
                &[roles::PRINCIPAL, roles::TENANT],
                false,
            ),
            rule(
                "PATCH",
                "/api/products/:id",
                &[roles::PRINCIPAL, roles::TENANT],
                false,
            ),
            rule("DELETE", "/api/products/:id", &[roles::PRINCIPAL], false),
            // Product images
            rule(
                "POST",
                "/api/products/:id/images",
                &[roles::PRINCIPAL, roles::TENANT],
                false,
            ),
            rule(
                "DELETE",
                "/api/products/:id/images/:image_id",
                &[roles::PRINCIPAL],
                false,
            ),
            // Country products (stock/pricing): writes are country-scoped.
            rule(
                "POST",
                "/api/country-products",
                &[roles::PRINCIPAL, roles::TENANT],
                true,
            ),
            rule(
                "GET",
                "/api/country-products/*",
                &[roles::PRINCIPAL, roles::TENANT, roles::USER],
                false,
            ),
            rule(
                "PUT",
                "/api/country-products/:id",
                &[roles::PRINCIPAL, roles::TENANT],
                true,
            ),
            rule(
                "PATCH",
                "/api/country-products/:id",
                &[roles::PRINCIPAL, roles::TENANT],
                true,
            ),
            rule(
                "DELETE",
                "/api/country-products/:id",
                &[roles::PRINCIPAL, roles::TENANT],
                true,
            ),
        ])
    }
}

fn rule(
    method: &'static str,
    template: &'static str,
    allowed: &[&'static str],
    country_scoped: bool,
) -> PermissionRule {
    PermissionRule {
        method: if method == "*" {
            MethodMatch::Any
        } else {
            MethodMatch::Is(Cow::Borrowed(method))
        },
        path: PathPattern::new(template),
        allowed_roles: allowed.iter().map(|r| Role::new(*r)).collect(),
        country_scoped,
    }
}
