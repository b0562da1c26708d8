//! Gateway-local routes. Everything else is proxied.

use axum::Json;
use axum::extract::Extension;
use axum::response::IntoResponse;

use crate::context::CorrelationId;

pub async fn health(
    correlation_id: Option<Extension<CorrelationId>>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "OK",
        "service": "omnigate",
        "correlationId": correlation_id.map(|Extension(id)| id.as_str().to_string()),
    }))
}
