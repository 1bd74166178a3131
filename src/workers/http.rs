//! HTTP hand-off to out-of-process work units.
//!
//! The unit's acknowledgment only accepts the work; the result arrives
//! later through the callback contract. Connect errors, timeouts, and
//! non-success acknowledgments are firing failures.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::NodeError;

use super::executor::{FireRequest, Fired, WorkUnitExecutor};

#[derive(Debug, Clone)]
pub struct HttpHandoffConfig {
    /// Bound on the whole hand-off request.
    pub request_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpHandoffConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 10,
        }
    }
}

/// Fires a worker node by POSTing the request to the endpoint named in the
/// node's config.
pub struct HttpWorkUnit {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpWorkUnit {
    pub fn new() -> Self {
        Self::with_config(HttpHandoffConfig::default())
    }

    pub fn with_config(config: HttpHandoffConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .expect("reqwest client builds with static config");
        HttpWorkUnit {
            client,
            timeout_secs: config.request_timeout.as_secs(),
        }
    }

    fn endpoint(config: &Value) -> Result<Url, NodeError> {
        let raw = config
            .get("endpoint")
            .and_then(|v| v.as_str())
            .ok_or(NodeError::MissingEndpoint)?;
        Url::parse(raw).map_err(|e| NodeError::InvalidEndpoint {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for HttpWorkUnit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkUnitExecutor for HttpWorkUnit {
    async fn fire(&self, request: &FireRequest) -> Result<Fired, NodeError> {
        let endpoint = Self::endpoint(&request.config)?;
        debug!(node_id = %request.node_id, endpoint = %endpoint, "handing off to work unit");

        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NodeError::FiringTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    NodeError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(Fired::Accepted)
    }
}
