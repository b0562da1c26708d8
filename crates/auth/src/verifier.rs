use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use omnigate_core::{CountryId, UserId};

use crate::{Identity, Role};

/// JWT claims the gateway expects from the auth service.
///
/// Claims the auth service omits default deterministically: `roles` to the
/// empty set, `countryId` and `email` to absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject / user identifier.
    pub sub: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default)]
    pub roles: Vec<Role>,

    /// Country the caller is scoped to, absent for unscoped accounts.
    #[serde(default, rename = "countryId", skip_serializing_if = "Option::is_none")]
    pub country_id: Option<CountryId>,

    /// Expiration timestamp (seconds since the epoch).
    pub exp: i64,

    /// Issued-at timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header, or a non-bearer scheme.
    #[error("Missing or malformed Authorization header")]
    MissingOrMalformed,

    #[error("Token expired")]
    Expired,

    /// Bad signature, malformed token, or missing required claims.
    #[error("Invalid token")]
    Invalid,

    /// Local misconfiguration: the verification secret is absent. Surfaces to
    /// callers as a generic internal error, never as accept or reject.
    #[error("signing secret is not configured")]
    MissingSecret,
}

/// Token verification contract.
///
/// Implementations must be pure with respect to external services: the check
/// is signature + expiry against local configuration only, so authentication
/// latency stays O(1) and independent of backend health.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError>;
}

/// HS256 verifier over a shared secret.
///
/// The secret is optional so that a misconfigured process can still boot and
/// report the problem per request instead of flapping at startup.
pub struct Hs256TokenVerifier {
    secret: Option<Vec<u8>>,
}

impl Hs256TokenVerifier {
    pub fn new(secret: Option<Vec<u8>>) -> Self {
        Self { secret }
    }

    pub fn from_secret(secret: impl Into<Vec<u8>>) -> Self {
        Self::new(Some(secret.into()))
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let secret = self.secret.as_deref().ok_or(AuthError::MissingSecret)?;

        // Expiry is checked against the injected clock below, not the wall
        // clock jsonwebtoken would consult, so tests stay deterministic.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret),
            &validation,
        )
        .map_err(|_| AuthError::Invalid)?;

        let claims = data.claims;
        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(Identity {
            user_id: claims.sub,
            email: claims.email,
            roles: claims.roles,
            country_id: claims.country_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &[u8] = b"test-jwt-secret";

    fn verifier() -> Hs256TokenVerifier {
        Hs256TokenVerifier::from_secret(SECRET)
    }

    fn mint(claims: &serde_json::Value, secret: &[u8]) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_identity() {
        let now = Utc::now();
        let token = mint(
            &serde_json::json!({
                "sub": "user-1",
                "email": "a@b.com",
                "roles": ["Principal"],
                "countryId": "c-1",
                "exp": (now + Duration::hours(1)).timestamp(),
                "iat": now.timestamp(),
            }),
            SECRET,
        );

        let identity = verifier().verify(&token, now).unwrap();
        assert_eq!(identity.user_id.as_str(), "user-1");
        assert_eq!(identity.email.as_deref(), Some("a@b.com"));
        assert!(identity.is_principal());
        assert_eq!(identity.country_id.as_ref().unwrap().as_str(), "c-1");
    }

    #[test]
    fn absent_claims_default_deterministically() {
        let now = Utc::now();
        let token = mint(
            &serde_json::json!({
                "sub": "user-2",
                "exp": (now + Duration::hours(1)).timestamp(),
            }),
            SECRET,
        );

        let identity = verifier().verify(&token, now).unwrap();
        assert!(identity.roles.is_empty());
        assert!(identity.country_id.is_none());
        assert!(identity.email.is_none());
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let now = Utc::now();
        let token = mint(
            &serde_json::json!({
                "sub": "user-1",
                "exp": (now - Duration::seconds(1)).timestamp(),
            }),
            SECRET,
        );

        assert_eq!(verifier().verify(&token, now), Err(AuthError::Expired));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let now = Utc::now();
        let token = mint(
            &serde_json::json!({
                "sub": "user-1",
                "exp": (now + Duration::hours(1)).timestamp(),
            }),
            b"other-secret",
        );

        assert_eq!(verifier().verify(&token, now), Err(AuthError::Invalid));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let now = Utc::now();
        assert_eq!(
            verifier().verify("not-a-jwt", now),
            Err(AuthError::Invalid)
        );
    }

    #[test]
    fn token_without_exp_is_invalid() {
        let now = Utc::now();
        let token = mint(&serde_json::json!({ "sub": "user-1" }), SECRET);
        assert_eq!(verifier().verify(&token, now), Err(AuthError::Invalid));
    }

    #[test]
    fn missing_secret_is_a_distinct_internal_outcome() {
        let now = Utc::now();
        let token = mint(
            &serde_json::json!({
                "sub": "user-1",
                "exp": (now + Duration::hours(1)).timestamp(),
            }),
            SECRET,
        );

        let unconfigured = Hs256TokenVerifier::new(None);
        assert_eq!(
            unconfigured.verify(&token, now),
            Err(AuthError::MissingSecret)
        );
    }
}
