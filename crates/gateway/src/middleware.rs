//! The request pipeline: correlation, authentication, route authorization,
//! country scope. Each stage either enriches the request's extensions or
//! short-circuits into a structured rejection.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use omnigate_auth::{AuthError, AuthzError, Identity, authorize};

use crate::app::GatewayState;
use crate::context::{CorrelationId, RoutePermission};
use crate::errors;
use crate::scope;

pub const CORRELATION_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Create payloads are the only bodies the pipeline inspects; anything this
/// large is not a create payload.
const MAX_INSPECTED_BODY_BYTES: usize = 1024 * 1024;

/// Attach a correlation id, echo it on the response, and emit one completion
/// log line per request, levelled by status class.
pub async fn correlation(mut req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(&CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(CorrelationId::new)
        .unwrap_or_else(CorrelationId::generate);

    req.extensions_mut().insert(correlation_id.clone());

    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::error!(%method, %path, status, elapsed_ms, correlation_id = %correlation_id, "request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %path, status, elapsed_ms, correlation_id = %correlation_id, "request rejected");
    } else {
        tracing::info!(%method, %path, status, elapsed_ms, correlation_id = %correlation_id, "request completed");
    }

    if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// Verify the bearer credential and attach the resulting [`Identity`].
pub async fn authenticate(
    State(state): State<GatewayState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = match bearer_token(req.headers())
        .and_then(|token| state.verifier.verify(token, Utc::now()))
    {
        Ok(identity) => identity,
        Err(err) => {
            if err == AuthError::MissingSecret {
                tracing::error!("JWT secret is not configured");
            }
            return errors::auth_rejection(err);
        }
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingOrMalformed)?;

    let header = header.to_str().map_err(|_| AuthError::MissingOrMalformed)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingOrMalformed)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MissingOrMalformed);
    }

    Ok(token)
}

/// Resolve the permission rule for the request (deny-by-default) and attach
/// it for the downstream stages.
pub async fn authorize_route(
    State(state): State<GatewayState>,
    mut req: Request,
    next: Next,
) -> Response {
    // The routes are registered at the top level, so the URI still carries
    // the full, un-stripped path. Query string excluded.
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let Some(identity) = req.extensions().get::<Identity>().cloned() else {
        tracing::error!(%method, %path, "authorize stage reached without an identity");
        return errors::reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    };

    match authorize(&state.registry, &identity, method.as_str(), &path) {
        Ok(rule) => {
            req.extensions_mut()
                .insert(RoutePermission(Arc::new(rule.clone())));
            next.run(req).await
        }
        Err(err @ AuthzError::NoRuleMatched { .. }) => {
            tracing::warn!(%method, %path, "no permission rule matched, denied by default");
            errors::authz_rejection(err)
        }
        Err(err) => {
            tracing::warn!(
                %method,
                %path,
                caller_roles = ?identity.roles,
                "caller roles do not satisfy the matched rule"
            );
            errors::authz_rejection(err)
        }
    }
}

/// Enforce country scoping for routes whose matched rule demands it.
///
/// Create requests have their JSON body buffered for inspection and restored
/// afterwards; all other bodies stream through untouched so uploads are not
/// forced into memory.
pub async fn country_scope(
    State(state): State<GatewayState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(RoutePermission(rule)) = req.extensions().get::<RoutePermission>().cloned() else {
        return next.run(req).await;
    };
    if !rule.country_scoped {
        return next.run(req).await;
    }

    let Some(identity) = req.extensions().get::<Identity>().cloned() else {
        tracing::error!("scope stage reached without an identity");
        return errors::reject(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    };
    let correlation_id = req
        .extensions()
        .get::<CorrelationId>()
        .cloned()
        .unwrap_or_else(CorrelationId::generate);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let (req, body_json) = if method == Method::POST {
        match buffer_json_body(req).await {
            Ok(buffered) => buffered,
            Err(rejection) => return rejection,
        }
    } else {
        (req, None)
    };

    let outcome = scope::enforce(
        &rule,
        &identity,
        method.as_str(),
        &path,
        body_json.as_ref(),
        state.lookup.as_ref(),
        &correlation_id,
    )
    .await;

    match outcome {
        Ok(()) => {
            tracing::debug!(
                user_id = %identity.user_id,
                %method,
                %path,
                "request admitted"
            );
            next.run(req).await
        }
        Err(denial) => errors::scope_rejection(denial),
    }
}

/// Buffer the request body, parse it as JSON if possible, and rebuild the
/// request so the forwarder still sees the original bytes. A non-JSON body
/// simply yields no parsed value (and therefore no declared country).
async fn buffer_json_body(req: Request) -> Result<(Request, Option<serde_json::Value>), Response> {
    let (parts, body) = req.into_parts();

    let bytes = match axum::body::to_bytes(body, MAX_INSPECTED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return Err(errors::reject(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
            ));
        }
    };

    let parsed = serde_json::from_slice::<serde_json::Value>(&bytes).ok();
    let req = Request::from_parts(parts, Body::from(bytes));
    Ok((req, parsed))
}
