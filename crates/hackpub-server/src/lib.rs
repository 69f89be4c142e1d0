//! HTTP publishing service for hackpub.
//!
//! Clients POST HTML or JSON to `/publish`, the service stores it under a
//! freshly allocated key and answers with the document's metadata, including
//! its public URL. Several independently configured services can share one
//! HTTP endpoint through the path-prefix [`Multiplexer`].

pub mod clock;
pub mod config;
pub mod cors;
pub mod error;
pub mod handler;
pub mod multiplexer;
pub mod router;
pub mod server;
pub mod service;
pub mod validator;

pub use clock::{http_date, Clock, FixedClock, SystemClock};
pub use config::{MultiplexerConfig, PublishConfig, ServerConfig, ServiceConfig};
pub use error::{ApiError, ServerError, ServerResult};
pub use multiplexer::Multiplexer;
pub use server::HackpubServer;
pub use service::PublishService;
pub use validator::{Rejection, Submission};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{HeaderMap, Request, StatusCode};
    use axum::Router;
    use hackpub_store::{ContentType, DocumentStore, InMemoryDocumentStore, KeyAllocator};
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    use tower::util::ServiceExt;

    const FORM: &str = "application/x-www-form-urlencoded";

    struct Harness {
        router: Router,
        store: Arc<InMemoryDocumentStore>,
    }

    fn test_config() -> PublishConfig {
        PublishConfig {
            allow_origins: Some("*".into()),
            max_payload_size: 5000,
            enable_ppx: true,
        }
    }

    fn harness_with(config: PublishConfig, keys: &[&str]) -> Harness {
        let store = Arc::new(
            InMemoryDocumentStore::with_allocator(
                "http://pages.foo.org/",
                KeyAllocator::sequence(keys.iter().copied()),
            )
            .unwrap(),
        );
        let service = PublishService::new(
            config,
            store.clone(),
            Arc::new(FixedClock::from_unix(1_316_449_290, 594_553_000)),
        )
        .unwrap();
        Harness {
            router: service.router(),
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(test_config(), &["beoab"])
    }

    fn form(fields: &[(&str, &str)]) -> String {
        fields
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, NON_ALPHANUMERIC),
                    utf8_percent_encode(v, NON_ALPHANUMERIC)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    struct Reply {
        status: StatusCode,
        headers: HeaderMap,
        body: String,
    }

    impl Reply {
        fn json(&self) -> BTreeMap<String, String> {
            serde_json::from_str(&self.body).unwrap()
        }

        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).map(|v| v.to_str().unwrap())
        }
    }

    async fn request(router: &Router, request: Request<Body>) -> Reply {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Reply {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    async fn call(router: &Router, method: &str, uri: &str) -> Reply {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        request(router, req).await
    }

    async fn post_form(router: &Router, uri: &str, body: String) -> Reply {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", FORM)
            .body(Body::from(body))
            .unwrap();
        request(router, req).await
    }

    const SAMPLE_HTML: &str = "<p>hello\u{2026}</p>";
    const SAMPLE_JSON: &str = "{\"hi\": \"hello\\u2026\"}";

    async fn post_sample_doc(router: &Router, uri: &str) -> Reply {
        post_form(
            router,
            uri,
            form(&[("html", SAMPLE_HTML), ("original-url", "http://bar.com/")]),
        )
        .await
    }

    async fn post_sample_json(router: &Router) -> Reply {
        post_form(
            router,
            "/publish",
            form(&[("json", SAMPLE_JSON), ("original-url", "http://bar.com/")]),
        )
        .await
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn publishing_massive_content_results_in_error() {
        let h = harness();
        let html = format!("<p>{}</p>", "!".repeat(5000));
        let res = post_form(
            &h.router,
            "/publish",
            form(&[("html", &html), ("original-url", "http://bar.com/")]),
        )
        .await;
        assert_eq!(res.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(res.body, "");
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn oversized_declared_length_is_refused_unread() {
        let h = harness();
        let req = Request::builder()
            .method("POST")
            .uri("/publish")
            .header("content-type", FORM)
            .header("content-length", "100000")
            .body(Body::from("html=hi"))
            .unwrap();
        assert_eq!(request(&h.router, req).await.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn publishing_malformed_body_results_in_error() {
        let h = harness();
        let res = post_form(&h.router, "/publish", "garbage".into()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, "Unrecognized content.");
    }

    #[tokio::test]
    async fn publishing_without_body_results_in_error() {
        let h = harness();
        let res = call(&h.router, "POST", "/publish").await;
        assert_eq!(res.status, StatusCode::LENGTH_REQUIRED);
        assert_eq!(res.body, "");
    }

    #[tokio::test]
    async fn undecodable_content_type_does_not_preempt_length_check() {
        let h = harness();
        let content_type =
            axum::http::HeaderValue::from_bytes(b"application/x-www-form-urlencoded; charset=\xe9")
                .unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/publish")
            .header("content-type", content_type.clone())
            .body(Body::empty())
            .unwrap();
        let res = request(&h.router, req).await;
        assert_eq!(res.status, StatusCode::LENGTH_REQUIRED);
        assert_eq!(res.body, "");

        let req = Request::builder()
            .method("POST")
            .uri("/publish")
            .header("content-type", content_type)
            .body(Body::from("!".repeat(6000)))
            .unwrap();
        assert_eq!(request(&h.router, req).await.status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn publishing_malformed_json_results_in_error() {
        let h = harness();
        let res = post_form(&h.router, "/publish", form(&[("json", "lol")])).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, "Malformed JSON.");
    }

    #[tokio::test]
    async fn publishing_without_html_results_in_error() {
        let h = harness();
        let res = post_form(&h.router, "/publish", form(&[("hi", "there")])).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, "Unrecognized content.");
    }

    #[tokio::test]
    async fn publishing_with_empty_html_results_in_error() {
        let h = harness();
        let res = post_form(&h.router, "/publish", form(&[("html", "  ")])).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body, "Unrecognized content.");
    }

    #[tokio::test]
    async fn using_unsupported_methods_results_in_error() {
        let h = harness();
        for method in ["PUT", "DELETE", "PATCH", "GET"] {
            let res = call(&h.router, method, "/publish").await;
            assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED, "{method}");
        }
    }

    #[tokio::test]
    async fn storage_failure_is_server_error() {
        let h = harness_with(test_config(), &[]);
        let res = post_sample_doc(&h.router, "/publish").await;
        assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(h.store.is_empty());
    }

    // -----------------------------------------------------------------------
    // Lookups and routing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_metadata_on_nonexistent_document_fails() {
        let h = harness();
        let res = call(&h.router, "GET", "/metadata/nonexistent").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn undecodable_metadata_key_is_not_found() {
        let h = harness();
        let res = call(&h.router, "GET", "/metadata/%FF").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, "not found: /metadata/%FF");
    }

    #[tokio::test]
    async fn get_nonexistent_path_fails() {
        let h = harness();
        let res = call(&h.router, "GET", "/nonexistent").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, "not found: /nonexistent");
    }

    #[tokio::test]
    async fn other_methods_on_known_paths_are_not_found() {
        let h = harness();
        assert_eq!(call(&h.router, "POST", "/metadata/beoab").await.status, StatusCode::NOT_FOUND);
        assert_eq!(call(&h.router, "DELETE", "/robots.txt").await.status, StatusCode::NOT_FOUND);
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn publishing_works() {
        let h = harness();
        let res = post_sample_doc(&h.router, "/publish").await;
        assert_eq!(res.status, StatusCode::OK);
        let json = res.json();
        assert_eq!(json["published-url"], "http://pages.foo.org/beoab");
        assert_eq!(json["original-url"], "http://bar.com/");
        assert_eq!(json["created"], "Mon, 19 Sep 2011 16:21:30 GMT");
    }

    #[tokio::test]
    async fn publishing_json_works() {
        let h = harness();
        let res = post_sample_json(&h.router).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["published-url"], "http://pages.foo.org/beoab");
    }

    #[tokio::test]
    async fn get_metadata_works() {
        let h = harness();
        post_sample_doc(&h.router, "/publish").await;
        let res = call(&h.router, "GET", "/metadata/beoab").await;
        assert_eq!(res.status, StatusCode::OK);
        let json = res.json();
        assert_eq!(json["original-url"], "http://bar.com/");
        assert_eq!(json["published-url"], "http://pages.foo.org/beoab");
        assert_eq!(json["created"], "Mon, 19 Sep 2011 16:21:30 GMT");
    }

    #[tokio::test]
    async fn fetching_published_html_works() {
        let h = harness();
        post_sample_doc(&h.router, "/publish").await;
        let (content, content_type) = h.store.get_content("beoab").unwrap().unwrap();
        assert_eq!(content, SAMPLE_HTML.as_bytes());
        assert_eq!(content_type.as_str(), "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn fetching_published_json_works() {
        let h = harness();
        post_sample_json(&h.router).await;
        let (content, content_type) = h.store.get_content("beoab").unwrap().unwrap();
        assert_eq!(content, SAMPLE_JSON.as_bytes());
        assert_eq!(content_type, ContentType::Json);
    }

    // -----------------------------------------------------------------------
    // Static routes
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn ppx_server() {
        let h = harness();
        let res = call(&h.router, "GET", "/ppx-server").await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.contains("<!DOCTYPE html>"));
        assert!(res.header("content-type").unwrap().starts_with("text/html"));
    }

    #[tokio::test]
    async fn ppx_server_can_be_disabled() {
        let h = harness_with(PublishConfig::default(), &["beoab"]);
        let res = call(&h.router, "GET", "/ppx-server").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn data_is_not_spidered() {
        for config in [test_config(), PublishConfig::default()] {
            let h = harness_with(config, &[]);
            let res = call(&h.router, "GET", "/robots.txt").await;
            assert_eq!(res.status, StatusCode::OK);
            assert_eq!(res.body, "User-agent: *\r\nDisallow: /\r\n");
        }
    }

    // -----------------------------------------------------------------------
    // CORS
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn cross_origin_resource_sharing() {
        let h = harness();
        let res = call(&h.router, "OPTIONS", "/publish").await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header("access-control-allow-origin"), Some("*"));
        assert_eq!(res.header("access-control-allow-headers"), Some("x-requested-with"));
        assert_eq!(res.header("access-control-allow-methods"), Some("OPTIONS, GET, POST"));
    }

    #[tokio::test]
    async fn preflight_ignores_request_body() {
        let h = harness();
        for body in ["garbage".to_string(), "!".repeat(6000)] {
            let req = Request::builder()
                .method("OPTIONS")
                .uri("/publish")
                .header("content-type", FORM)
                .body(Body::from(body))
                .unwrap();
            let res = request(&h.router, req).await;
            assert_eq!(res.status, StatusCode::OK);
            assert_eq!(res.body, "");
            assert_eq!(res.header("access-control-allow-origin"), Some("*"));
            assert_eq!(res.header("access-control-allow-methods"), Some("OPTIONS, GET, POST"));
        }
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn errors_carry_allow_origin() {
        let h = harness();
        assert_eq!(call(&h.router, "GET", "/nonexistent").await.header("access-control-allow-origin"), Some("*"));
        assert_eq!(call(&h.router, "PUT", "/publish").await.header("access-control-allow-origin"), Some("*"));
        assert_eq!(call(&h.router, "POST", "/publish").await.header("access-control-allow-origin"), Some("*"));
    }

    #[tokio::test]
    async fn cors_disabled_sends_no_headers() {
        let h = harness_with(PublishConfig::default(), &["beoab"]);
        let res = call(&h.router, "OPTIONS", "/publish").await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.header("access-control-allow-origin").is_none());
        assert!(res.header("access-control-allow-methods").is_none());
        let res = post_sample_doc(&h.router, "/publish").await;
        assert!(res.header("access-control-allow-origin").is_none());
    }

    // -----------------------------------------------------------------------
    // Multiplexing
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn multiplexing_integration() {
        let h = harness();
        let sample = Router::new().route("/", axum::routing::get(|| async { "sample app" }));
        let mux = Multiplexer::new("more")
            .unwrap()
            .mount("foopages", h.router.clone())
            .unwrap()
            .fallback(sample)
            .into_router();

        let res = call(&mux, "POST", "/more/foopages/publish").await;
        assert_eq!(res.status, StatusCode::LENGTH_REQUIRED);

        let res = call(&mux, "GET", "/more/foopages/blarg").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, "not found: /more/foopages/blarg");

        let res = call(&mux, "GET", "/more/nopages/blarg").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, "not found: /more/nopages/blarg");

        let res = post_sample_doc(&mux, "/more/foopages/publish").await;
        assert_eq!(res.status, StatusCode::OK);
        let res = call(&mux, "GET", "/more/foopages/metadata/beoab").await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.json()["published-url"], "http://pages.foo.org/beoab");

        let res = call(&mux, "GET", "/").await;
        assert_eq!(res.body, "sample app");
    }

    #[tokio::test]
    async fn bare_prefix_never_reaches_fallback() {
        let h = harness();
        let catch_all = Router::new().fallback(|| async { "sample app" });
        let mux = Multiplexer::new("more")
            .unwrap()
            .mount("foopages", h.router.clone())
            .unwrap()
            .fallback(catch_all)
            .into_router();

        for path in ["/more", "/more/"] {
            let res = call(&mux, "GET", path).await;
            assert_eq!(res.status, StatusCode::NOT_FOUND, "{path}");
            assert_eq!(res.body, format!("not found: {path}"));
        }
        assert_eq!(call(&mux, "GET", "/moreover").await.body, "sample app");
    }

    #[tokio::test]
    async fn multiplexed_services_are_independent() {
        let a = harness_with(test_config(), &["aaaaa"]);
        let b = harness_with(PublishConfig::default(), &["bbbbb"]);
        let mux = Multiplexer::new("more")
            .unwrap()
            .mount("a", a.router.clone())
            .unwrap()
            .mount("b", b.router.clone())
            .unwrap()
            .into_router();

        post_sample_doc(&mux, "/more/a/publish").await;
        assert_eq!(a.store.len(), 1);
        assert!(b.store.is_empty());
        assert_eq!(call(&mux, "GET", "/more/b/metadata/aaaaa").await.status, StatusCode::NOT_FOUND);
        assert_eq!(call(&mux, "GET", "/more/b/ppx-server").await.status, StatusCode::NOT_FOUND);
        assert_eq!(call(&mux, "GET", "/more/a/ppx-server").await.status, StatusCode::OK);
    }
}
