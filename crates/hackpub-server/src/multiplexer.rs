//! Path-prefix multiplexing of named services.
//!
//! A request to `/<prefix>/<name>/<rest>` is forwarded to the service mounted
//! under `name` as `/<rest>`. Paths are handled as raw, still-encoded
//! segments: nothing is decoded on the way through, so the inner service sees
//! exactly the bytes the client sent after the mount point.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{OriginalUri, Request, State};
use axum::http::Uri;
use axum::response::Response;
use axum::Router;
use tower::util::ServiceExt;

use crate::error::{ServerError, ServerResult};
use crate::handler::not_found_response;

/// Characters never allowed in a prefix or service name.
const FORBIDDEN_CHARS: &[char] = &['/', '?', '#', '%'];

/// Check that `segment` can be used verbatim as one path segment.
pub fn validate_segment(segment: &str) -> ServerResult<()> {
    let invalid = |reason: &str| ServerError::InvalidMount {
        name: segment.to_string(),
        reason: reason.to_string(),
    };
    if segment.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if segment == "." || segment == ".." {
        return Err(invalid("must not be a dot segment"));
    }
    if segment.chars().any(|c| c.is_whitespace() || FORBIDDEN_CHARS.contains(&c)) {
        return Err(invalid("contains a forbidden character"));
    }
    Ok(())
}

/// Where a request path lands relative to the mount prefix.
#[derive(Debug, PartialEq, Eq)]
pub enum MountTarget<'a> {
    /// `/<prefix>/<name>/<rest>`: forward `rest` (always starting with `/`).
    Service { name: &'a str, rest: String },
    /// Under the prefix but without a service name.
    Prefix,
    /// Not under the prefix at all.
    Outside,
}

/// Split `path` into its mount target.
///
/// `/<prefix>/<name>` and `/<prefix>/<name>/` both forward `/`. Empty
/// segments inside the remainder are preserved.
pub fn split_mount<'a>(path: &'a str, prefix: &str) -> MountTarget<'a> {
    let Some(stripped) = path.strip_prefix('/') else {
        return MountTarget::Outside;
    };
    let mut segments = stripped.splitn(3, '/');
    if segments.next() != Some(prefix) {
        return MountTarget::Outside;
    }
    match segments.next() {
        Some(name) if !name.is_empty() => MountTarget::Service {
            name,
            rest: format!("/{}", segments.next().unwrap_or_default()),
        },
        _ => MountTarget::Prefix,
    }
}

/// Replace the path of `uri`, keeping its query string.
fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse().ok()?);
    Uri::from_parts(parts).ok()
}

/// Composes independently configured services under one router.
///
/// # Example
///
/// ```
/// use axum::Router;
/// use hackpub_server::Multiplexer;
///
/// let router = Multiplexer::new("more")
///     .unwrap()
///     .mount("foopages", Router::new())
///     .unwrap()
///     .into_router();
/// # let _ = router;
/// ```
#[derive(Clone, Debug)]
pub struct Multiplexer {
    prefix: String,
    services: BTreeMap<String, Router>,
    fallback: Option<Router>,
}

impl Multiplexer {
    pub fn new(prefix: impl Into<String>) -> ServerResult<Self> {
        let prefix = prefix.into();
        validate_segment(&prefix)?;
        Ok(Self {
            prefix,
            services: BTreeMap::new(),
            fallback: None,
        })
    }

    /// Mount `service` under `/<prefix>/<name>/`.
    pub fn mount(mut self, name: impl Into<String>, service: Router) -> ServerResult<Self> {
        let name = name.into();
        validate_segment(&name)?;
        if self.services.contains_key(&name) {
            return Err(ServerError::DuplicateMount(name));
        }
        self.services.insert(name, service);
        Ok(self)
    }

    /// Serve paths outside the prefix with `service`, unchanged.
    pub fn fallback(mut self, service: Router) -> Self {
        self.fallback = Some(service);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mounted service names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn into_router(self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(Arc::new(self))
    }
}

async fn dispatch(State(mux): State<Arc<Multiplexer>>, mut request: Request) -> Response {
    if request.extensions().get::<OriginalUri>().is_none() {
        let original = OriginalUri(request.uri().clone());
        request.extensions_mut().insert(original);
    }
    let path = request.uri().path().to_string();

    match split_mount(&path, &mux.prefix) {
        MountTarget::Service { name, rest } => {
            let Some(service) = mux.services.get(name) else {
                tracing::debug!(%path, name, "no service mounted under name");
                return not_found_response(&path);
            };
            let Some(uri) = with_path(request.uri(), &rest) else {
                tracing::warn!(%path, "could not rewrite request path");
                return not_found_response(&path);
            };
            *request.uri_mut() = uri;
            forward(service, request).await
        }
        MountTarget::Prefix => not_found_response(&path),
        MountTarget::Outside => match &mux.fallback {
            Some(service) => forward(service, request).await,
            None => {
                tracing::debug!(%path, "request outside mount prefix");
                not_found_response(&path)
            }
        },
    }
}

async fn forward(service: &Router, request: Request) -> Response {
    let result: Result<Response, Infallible> = service.clone().oneshot(request).await;
    match result {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
