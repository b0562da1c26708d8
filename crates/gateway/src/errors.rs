//! Client-visible rejection mapping.
//!
//! Every pipeline denial is translated here into the gateway's standard
//! rejection shape and never travels further into the pipeline or to a
//! backend.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use omnigate_auth::{AuthError, AuthzError};

use crate::scope::ScopeDenial;

/// Standard rejection body: `{ "error": { "message": ..., "status": ... } }`.
pub fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": { "message": message.into(), "status": status.as_u16() }
        })),
    )
        .into_response()
}

pub fn auth_rejection(err: AuthError) -> Response {
    match err {
        // Never leak the misconfiguration detail to callers.
        AuthError::MissingSecret => {
            reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
        AuthError::MissingOrMalformed | AuthError::Expired | AuthError::Invalid => {
            reject(StatusCode::UNAUTHORIZED, err.to_string())
        }
    }
}

pub fn authz_rejection(err: AuthzError) -> Response {
    match err {
        AuthzError::NoRuleMatched { .. } => reject(StatusCode::FORBIDDEN, "Forbidden"),
        AuthzError::InsufficientRole => {
            reject(StatusCode::FORBIDDEN, "Forbidden — insufficient permissions")
        }
    }
}

pub fn scope_rejection(denial: ScopeDenial) -> Response {
    reject(StatusCode::FORBIDDEN, denial.to_string())
}
