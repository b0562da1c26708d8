//! HTTP application wiring (axum router + middleware pipeline).
//!
//! Route groups:
//! - `/health`: public liveness probe
//! - `/auth/*`: forwarded to the auth service (logout requires a token)
//! - `/api/*`: forwarded to the product service behind the full pipeline

use std::sync::Arc;

use axum::extract::{Extension, Request};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use axum::http::StatusCode;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use omnigate_auth::{Hs256TokenVerifier, PermissionRegistry, TokenVerifier};

use crate::config::GatewayConfig;
use crate::middleware;
use crate::proxy::Upstream;
use crate::routes;
use crate::scope::{HttpResourceLookup, ResourceLookup};

/// Shared, read-only collaborators for the request pipeline.
#[derive(Clone)]
pub struct GatewayState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub registry: Arc<PermissionRegistry>,
    pub lookup: Arc<dyn ResourceLookup>,
}

/// Build the production router from configuration.
pub fn build_app(config: &GatewayConfig) -> Router {
    let client = reqwest::Client::new();

    let state = GatewayState {
        verifier: Arc::new(Hs256TokenVerifier::new(
            config.jwt_secret.clone().map(String::into_bytes),
        )),
        registry: Arc::new(PermissionRegistry::standard()),
        lookup: Arc::new(HttpResourceLookup::new(
            client.clone(),
            config.product_service_url.clone(),
            config.lookup_timeout,
        )),
    };

    let products = Upstream::new(client.clone(), config.product_service_url.clone());
    let auth_service = Upstream::new(client, config.auth_service_url.clone());

    build_router(state, products, auth_service)
}

/// Router construction with injectable collaborators (tests wire in stubs).
pub fn build_router(state: GatewayState, products: Upstream, auth_service: Upstream) -> Router {
    // Product-service surface: authenticate → authorize → country scope →
    // forward. Layers added last run first.
    let protected = proxy_routes(&["/api/countries", "/api/products", "/api/country-products"])
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::country_scope,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authorize_route,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(Extension(products));

    // Public auth endpoints are forwarded as-is; logout must present a valid
    // token first (the auth service expects an authenticated caller).
    let auth_public = Router::new()
        .route("/auth/signup", post(forward))
        .route("/auth/login", post(forward))
        .route("/auth/refresh", post(forward))
        .layer(Extension(auth_service.clone()));

    let auth_protected = Router::new()
        .route("/auth/logout", post(forward))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::authenticate,
        ))
        .layer(Extension(auth_service));

    Router::new()
        .route("/health", get(routes::health))
        .merge(auth_public)
        .merge(auth_protected)
        .merge(protected)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(axum::middleware::from_fn(middleware::correlation))
        .layer(ServiceBuilder::new())
}

/// Register a proxied prefix: the bare path, its slash form, and the whole
/// subtree. Handlers read the full URI, so nothing is ever mount-stripped.
fn proxy_routes(prefixes: &[&str]) -> Router {
    let mut router = Router::new();
    for &prefix in prefixes {
        router = router
            .route(prefix, any(forward))
            .route(&format!("{prefix}/"), any(forward))
            .route(&format!("{prefix}/*rest"), any(forward));
    }
    router
}

async fn forward(Extension(upstream): Extension<Upstream>, req: Request) -> Response {
    upstream.forward(req).await
}

/// Boundary for unexpected panics in any stage: log, answer a generic 500,
/// leak nothing.
fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "unhandled panic while serving request");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": { "message": "Internal Server Error", "status": 500 }
        })),
    )
        .into_response()
}
