use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::multiplexer::validate_segment;

/// Default byte threshold above which a publish is rejected with 413.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 10_000;

/// Behavior switches for one publishing service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Value of `Access-Control-Allow-Origin`; `None` disables CORS headers.
    pub allow_origins: Option<String>,
    /// Largest accepted publish body, in bytes.
    pub max_payload_size: usize,
    /// Serve the postMessage proxy page at `/ppx-server`.
    pub enable_ppx: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            allow_origins: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            enable_ppx: false,
        }
    }
}

impl PublishConfig {
    /// Check every field, returning one message per problem.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.max_payload_size == 0 {
            problems.push("max_payload_size must be greater than zero".to_string());
        }
        if let Some(origin) = &self.allow_origins {
            if origin.trim().is_empty() {
                problems.push("allow_origins must not be empty".to_string());
            } else if HeaderValue::from_str(origin).is_err() {
                problems.push(format!("allow_origins is not a valid header value: {origin:?}"));
            }
        }
        problems
    }

    pub fn validate(&self) -> ServerResult<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Config(problems.join("; ")))
        }
    }

    /// The CORS origin as a header value, if CORS is enabled and valid.
    pub fn allow_origin_header(&self) -> Option<HeaderValue> {
        self.allow_origins
            .as_deref()
            .and_then(|origin| HeaderValue::from_str(origin).ok())
    }
}

/// One named service behind the multiplexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Prefix of every URL this service publishes.
    pub url_base: String,
    #[serde(default)]
    pub publish: PublishConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiplexerConfig {
    /// First path segment shared by all named services.
    pub prefix: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
}

/// Top-level configuration, usually read from a TOML file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Prefix of every URL the root service publishes.
    pub url_base: String,
    pub publish: PublishConfig,
    pub multiplexer: Option<MultiplexerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let bind_addr = SocketAddr::from(([127, 0, 0, 1], 8000));
        Self {
            bind_addr,
            url_base: format!("http://{bind_addr}/"),
            publish: PublishConfig::default(),
            multiplexer: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validate the root service and every named service, reporting all
    /// problems at once.
    pub fn validate(&self) -> ServerResult<()> {
        let mut problems = Vec::new();
        if self.url_base.trim().is_empty() {
            problems.push("url_base must not be empty".to_string());
        }
        problems.extend(self.publish.problems());

        if let Some(mux) = &self.multiplexer {
            if let Err(e) = validate_segment(&mux.prefix) {
                problems.push(format!("multiplexer: {e}"));
            }
            for (name, service) in &mux.services {
                if let Err(e) = validate_segment(name) {
                    problems.push(format!("multiplexer: {e}"));
                }
                if service.url_base.trim().is_empty() {
                    problems.push(format!("service {name}: url_base must not be empty"));
                }
                problems.extend(
                    service
                        .publish
                        .problems()
                        .into_iter()
                        .map(|p| format!("service {name}: {p}")),
                );
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServerError::Config(problems.join("; ")))
        }
    }
}
