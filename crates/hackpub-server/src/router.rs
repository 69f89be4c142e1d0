use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::cors;
use crate::handler;
use crate::service::PublishService;

/// HTTP paths served by a publishing service.
pub mod endpoints {
    pub const PUBLISH: &str = "/publish";
    pub const METADATA: &str = "/metadata/:key";
    pub const PPX_SERVER: &str = "/ppx-server";
    pub const ROBOTS_TXT: &str = "/robots.txt";
}

/// Build the axum router for one publishing service.
///
/// `/publish` answers unsupported methods with 405; every other path only
/// knows GET and answers anything else with 404.
pub fn build_router(service: PublishService) -> Router {
    let mut router = Router::new()
        .route(
            endpoints::PUBLISH,
            post(handler::publish).options(handler::preflight),
        )
        .route(
            endpoints::METADATA,
            get(handler::metadata).fallback(handler::not_found),
        )
        .route(
            endpoints::ROBOTS_TXT,
            get(handler::robots_txt).fallback(handler::not_found),
        );
    if service.config().enable_ppx {
        router = router.route(
            endpoints::PPX_SERVER,
            get(handler::ppx_server).fallback(handler::not_found),
        );
    }

    let origin = service.allow_origin().cloned();
    router
        .fallback(handler::not_found)
        .layer(middleware::from_fn_with_state(origin, cors::allow_origin))
        .with_state(service)
}
