//! `omnigate-auth` — pure authentication/authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: it verifies
//! bearer tokens into typed identities and resolves route permissions against
//! a static, deny-by-default rule table. All functions here are synchronous
//! and free of I/O.

pub mod authorize;
pub mod identity;
pub mod registry;
pub mod roles;
pub mod verifier;

pub use authorize::{AuthzError, authorize};
pub use identity::Identity;
pub use registry::{MethodMatch, PathPattern, PermissionRegistry, PermissionRule};
pub use roles::{PRINCIPAL, Role, TENANT, USER};
pub use verifier::{AuthError, Claims, Hs256TokenVerifier, TokenVerifier};
