use std::sync::Arc;

use axum::Router;
use hackpub_store::InMemoryDocumentStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::clock::{Clock, SystemClock};
use crate::config::{PublishConfig, ServerConfig};
use crate::error::{ServerError, ServerResult};
use crate::multiplexer::Multiplexer;
use crate::service::PublishService;

/// hackpub HTTP server.
pub struct HackpubServer {
    config: ServerConfig,
    clock: Arc<dyn Clock>,
}

impl HackpubServer {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn service(&self, url_base: &str, publish: &PublishConfig) -> ServerResult<PublishService> {
        let store = InMemoryDocumentStore::new(url_base)?;
        PublishService::new(publish.clone(), Arc::new(store), Arc::clone(&self.clock))
    }

    /// Build the router (useful for testing).
    ///
    /// Without a `[multiplexer]` section the root service answers every
    /// path. With one, the root service becomes the multiplexer's fallback
    /// and each named service gets its own store.
    pub fn router(&self) -> ServerResult<Router> {
        self.config.validate()?;
        let root = self.service(&self.config.url_base, &self.config.publish)?.router();

        let app = match &self.config.multiplexer {
            None => root,
            Some(mux_config) => {
                let mut mux = Multiplexer::new(mux_config.prefix.clone())?.fallback(root);
                for (name, service) in &mux_config.services {
                    let router = self.service(&service.url_base, &service.publish)?.router();
                    mux = mux.mount(name.clone(), router)?;
                }
                mux.into_router()
            }
        };
        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("hackpub server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
