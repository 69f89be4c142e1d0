use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use hackpub_store::{DocumentStore, Metadata, StoreResult, CREATED, ORIGINAL_URL, PUBLISHED_URL};

use crate::clock::{http_date, Clock};
use crate::config::PublishConfig;
use crate::error::ServerResult;
use crate::router::build_router;
use crate::validator::Submission;

/// One publishing service instance: configuration plus its collaborators.
///
/// Cheap to clone; everything behind it is shared and read-only apart from
/// what the store itself guards.
#[derive(Clone)]
pub struct PublishService {
    config: Arc<PublishConfig>,
    allow_origin: Option<HeaderValue>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl PublishService {
    pub fn new(
        config: PublishConfig,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> ServerResult<Self> {
        config.validate()?;
        Ok(Self {
            allow_origin: config.allow_origin_header(),
            config: Arc::new(config),
            store,
            clock,
        })
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// `Access-Control-Allow-Origin` value, when CORS is enabled.
    pub fn allow_origin(&self) -> Option<&HeaderValue> {
        self.allow_origin.as_ref()
    }

    /// Store an accepted submission and return its full metadata.
    pub fn publish(&self, submission: Submission) -> StoreResult<Metadata> {
        let mut metadata = Metadata::new();
        if let Some(url) = submission.original_url {
            metadata.insert(ORIGINAL_URL.to_string(), url);
        }
        metadata.insert(CREATED.to_string(), http_date(self.clock.now()));

        let published_url = self.store.create(
            submission.content,
            submission.content_type,
            metadata.clone(),
        )?;
        metadata.insert(PUBLISHED_URL.to_string(), published_url);
        Ok(metadata)
    }

    pub fn metadata(&self, key: &str) -> StoreResult<Option<Metadata>> {
        self.store.get_metadata(key)
    }

    /// Build the axum router serving this instance.
    pub fn router(&self) -> Router {
        build_router(self.clone())
    }
}

impl std::fmt::Debug for PublishService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
