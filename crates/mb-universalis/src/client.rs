//! HTTP client for the Universalis market API.
//!
//! One method per upstream resource; each performs a single request and
//! classifies failures into [`UpstreamError`]. Retry lives in
//! [`crate::RetryingFetcher`].

use crate::error::{UpstreamError, UpstreamResult};
use crate::models::{DataCenter, MarketDataResponse};
use crate::source::{SnapshotRequest, SnapshotSource, StatusProbe};
use async_trait::async_trait;
use mb_core::MarketData;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upstream connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// API root, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://universalis.app/api/v2".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("mb-universalis/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Client for the Universalis REST API.
#[derive(Clone)]
pub struct UniversalisClient {
    client: Client,
    base_url: String,
}

impl UniversalisClient {
    pub fn new(config: &UpstreamConfig) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| UpstreamError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn market_url(&self, request: &SnapshotRequest) -> String {
        format!("{}/{}/{}", self.base_url, request.scope, request.item_id)
    }

    /// Fetch market data for one item in one scope.
    pub async fn fetch_market(&self, request: &SnapshotRequest) -> UpstreamResult<MarketData> {
        if request.item_id == 0 {
            return Err(UpstreamError::InvalidRequest("item id 0".to_string()));
        }

        let url = self.market_url(request);
        debug!(
            url = %url,
            listings = request.listing_limit,
            entries = request.history_limit,
            no_tax = request.no_tax,
            "Fetching market data"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("listings", request.listing_limit.to_string()),
                ("entries", request.history_limit.to_string()),
                ("noGst", request.no_tax.to_string()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let body = read_success_body(response).await?;
        let parsed: MarketDataResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(
                item_id = request.item_id,
                scope = %request.scope,
                error = %e,
                "Failed to parse market data"
            );
            UpstreamError::Parse(e.to_string())
        })?;

        let data = parsed.into_market_data();
        debug!(
            item_id = data.item_id,
            listings = data.listings.len(),
            history = data.history.len(),
            "Market data fetched"
        );
        Ok(data)
    }

    /// Fetch the data-center catalogue.
    pub async fn data_centers(&self) -> UpstreamResult<Vec<DataCenter>> {
        let url = format!("{}/data-centers", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let body = read_success_body(response).await?;
        let data_centers: Vec<DataCenter> =
            serde_json::from_str(&body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

        info!(count = data_centers.len(), "Fetched data centers");
        Ok(data_centers)
    }
}

/// Reject non-2xx responses, then read the body.
///
/// A failed body read is a transport failure; decoding happens later and
/// is classified separately.
async fn read_success_body(response: Response) -> UpstreamResult<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(UpstreamError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response
        .text()
        .await
        .map_err(|e| UpstreamError::Transport(format!("Failed to read body: {e}")))
}

#[async_trait]
impl SnapshotSource for UniversalisClient {
    async fn fetch_market_data(&self, request: &SnapshotRequest) -> UpstreamResult<MarketData> {
        self.fetch_market(request).await
    }
}

#[async_trait]
impl StatusProbe for UniversalisClient {
    async fn probe(&self) -> UpstreamResult<()> {
        self.data_centers().await.map(|_| ())
    }
}
