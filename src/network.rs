//! Network access for population and cache misses
//!
//! The agent never talks to the network directly; it goes through the
//! [`Network`] trait so hosts and tests can substitute their own transport.
//! [`HttpNetwork`] is the default implementation backed by `ureq`.

use crate::cache::request::{AssetRequest, CapturedResponse};
use crate::error::{GardenError, GardenResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Abstract network interface
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform `request` and capture the full response.
    ///
    /// Any HTTP status is a successful fetch; only transport failures
    /// return an error.
    async fn fetch(&self, request: &AssetRequest) -> GardenResult<CapturedResponse>;

    /// Human-readable transport name for display
    fn name(&self) -> &'static str;
}

/// Base URL that root-relative asset paths resolve against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    base: Url,
}

impl Origin {
    /// Parse an origin base URL (http or https only)
    pub fn parse(base_url: &str) -> GardenResult<Self> {
        let base = Url::parse(base_url).map_err(|e| GardenError::InvalidRequest {
            target: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(GardenError::InvalidRequest {
                target: base_url.to_string(),
                reason: format!("unsupported scheme '{}'", base.scheme()),
            });
        }

        Ok(Self { base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve a path (root-relative or absolute URL) against the origin
    pub fn resolve(&self, target: &str) -> GardenResult<Url> {
        self.base.join(target).map_err(|e| GardenError::InvalidRequest {
            target: target.to_string(),
            reason: e.to_string(),
        })
    }
}

/// HTTP transport using a shared `ureq` agent
#[derive(Clone)]
pub struct HttpNetwork {
    agent: ureq::Agent,
}

impl HttpNetwork {
    /// Create a transport with a global per-request timeout
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &AssetRequest) -> GardenResult<CapturedResponse> {
        let agent = self.agent.clone();
        let request = request.clone();
        let url = request.url.to_string();

        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &request))
            .await
            .map_err(|e| GardenError::network(url, format!("fetch task failed: {}", e)))?
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn fetch_blocking(agent: &ureq::Agent, request: &AssetRequest) -> GardenResult<CapturedResponse> {
    let url = request.url.as_str();

    let mut builder = ureq::http::Request::builder()
        .method(request.method.as_str())
        .uri(url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    let http_request = builder.body(()).map_err(|e| GardenError::InvalidRequest {
        target: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut response = agent
        .run(http_request)
        .map_err(|e| GardenError::network(url, e))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_vec()
        .map_err(|e| GardenError::network(url, e))?;

    debug!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());

    Ok(CapturedResponse {
        status,
        headers,
        body,
    })
}
