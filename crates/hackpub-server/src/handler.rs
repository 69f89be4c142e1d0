use axum::body::to_bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{OriginalUri, Path, Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use hackpub_store::Metadata;

use crate::cors;
use crate::error::ApiError;
use crate::service::PublishService;
use crate::validator::{self, Rejection};

/// Body of `GET /robots.txt`.
pub const ROBOTS_TXT: &str = "User-agent: *\r\nDisallow: /\r\n";

/// The postMessage proxy page.
pub const PPX_SERVER_HTML: &str = include_str!("../static/ppx-server.html");

/// POST /publish - validate, store, and answer with the document's metadata.
pub async fn publish(
    State(service): State<PublishService>,
    request: Request,
) -> Result<Json<Metadata>, ApiError> {
    let max = service.config().max_payload_size;
    let (parts, body) = request.into_parts();

    let declared = parts
        .headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > max as u64) {
        tracing::debug!(declared = ?declared, max, "publish refused before reading body");
        return Err(Rejection::PayloadTooLarge.into());
    }

    let content_type = parts.headers.get(CONTENT_TYPE).map(|v| v.as_bytes());

    // Reading stops one past the limit; a body that fails to arrive in full
    // is treated as oversized and nothing is stored.
    let body = to_bytes(body, max).await.map_err(|e| {
        tracing::debug!(error = %e, "publish body could not be read within limit");
        Rejection::PayloadTooLarge
    })?;

    let submission = validator::validate(content_type, &body, max).map_err(|rejection| {
        tracing::debug!(%rejection, bytes = body.len(), "publish rejected");
        rejection
    })?;
    let content_type = submission.content_type;
    let metadata = service.publish(submission)?;
    tracing::info!(
        url = metadata.get(hackpub_store::PUBLISHED_URL).map(String::as_str).unwrap_or_default(),
        content_type = %content_type,
        "document published"
    );
    Ok(Json(metadata))
}

/// OPTIONS /publish - CORS preflight. Never looks at the body.
pub async fn preflight(State(service): State<PublishService>) -> Response {
    if service.allow_origin().is_some() {
        (StatusCode::OK, cors::preflight_headers()).into_response()
    } else {
        StatusCode::OK.into_response()
    }
}

/// GET /metadata/:key
pub async fn metadata(
    State(service): State<PublishService>,
    OriginalUri(uri): OriginalUri,
    key: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Ok(Path(key)) = key else {
        tracing::debug!(path = %uri.path(), "metadata key could not be decoded");
        return Ok(not_found_response(uri.path()));
    };
    match service.metadata(&key)? {
        Some(metadata) => Ok(Json(metadata).into_response()),
        None => {
            tracing::debug!(key = %key, "metadata lookup missed");
            Ok(not_found_response(uri.path()))
        }
    }
}

/// GET /ppx-server
pub async fn ppx_server() -> Html<&'static str> {
    Html(PPX_SERVER_HTML)
}

/// GET /robots.txt
pub async fn robots_txt() -> &'static str {
    ROBOTS_TXT
}

/// Anything unrouted. Reports the path the client originally asked for,
/// including any multiplexer prefix.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> Response {
    not_found_response(uri.path())
}

pub(crate) fn not_found_response(path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("not found: {path}")).into_response()
}
