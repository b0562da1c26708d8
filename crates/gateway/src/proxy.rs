//! Reverse-proxy transport: relays admitted requests to a backend service.
//!
//! The forwarder is deliberately mechanical. By the time a request reaches
//! it every authorization decision has been made; the original method, full
//! path and query, headers, and body go through unchanged apart from
//! hop-by-hop headers.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::Response;

use crate::errors;

/// Upper bound on a relayed request body. Matches the largest payloads the
/// catalog services accept (image uploads included).
const MAX_FORWARD_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Headers that are connection-local and must not be relayed either way.
const HOP_BY_HOP: [HeaderName; 4] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
];

/// Request forwarder bound to a single backend base URL.
#[derive(Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
}

impl Upstream {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Forward the request and relay the backend response.
    ///
    /// The URI here is the full inbound path (nothing in the router strips a
    /// mount prefix), so the backend sees exactly what the caller sent.
    pub async fn forward(&self, req: Request) -> Response {
        let method = req.method().clone();
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let url = format!("{}{}", self.base_url, path_and_query);

        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_FORWARD_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(_) => {
                return errors::reject(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
        };

        let mut headers = parts.headers;
        strip_connection_headers(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::CONTENT_LENGTH);

        let sent = self
            .client
            .request(method.clone(), &url)
            .headers(headers)
            .body(bytes)
            .send()
            .await;

        let backend_response = match sent {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(%method, %url, error = %err, "backend request failed");
                return errors::reject(StatusCode::BAD_GATEWAY, "Bad gateway");
            }
        };

        let status = backend_response.status();
        let mut response_headers = backend_response.headers().clone();
        strip_connection_headers(&mut response_headers);
        response_headers.remove(header::CONTENT_LENGTH);

        let body = match backend_response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(%method, %url, error = %err, "backend response read failed");
                return errors::reject(StatusCode::BAD_GATEWAY, "Bad gateway");
            }
        };

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        response
    }
}

fn strip_connection_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(&name);
    }
}
