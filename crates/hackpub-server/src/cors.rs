//! Cross-origin resource sharing headers.

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

/// Request header jQuery adds to ajax calls.
pub const ALLOWED_HEADERS: &str = "x-requested-with";
/// Methods announced in a preflight answer.
pub const ALLOWED_METHODS: &str = "OPTIONS, GET, POST";

/// Middleware stamping `Access-Control-Allow-Origin` on every response.
///
/// A `None` origin means CORS is disabled and responses pass through
/// untouched.
pub async fn allow_origin(
    State(origin): State<Option<HeaderValue>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if let Some(origin) = origin {
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    response
}

/// Headers answering a preflight request.
pub fn preflight_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers
}
