//! HTTP client for the status and debug endpoints of a node.

use crate::configuration::ClientConfiguration;
use crate::error::ClientError;
use crate::views::{StatusResponse, SyncStatusResponse, TrackedShardsResponse};
use log::debug;
use reqwest::header::{self, HeaderMap};
use serde::de::DeserializeOwned;
use std::fmt;

/// The endpoints fetched for every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Cheap liveness probe with height and validator identity.
    Status,
    /// Full debug status including the node's peer connections.
    DebugStatus,
    /// Sync state machine of the node.
    SyncStatus,
    /// Shards tracked in this and the next epoch.
    TrackedShards,
}

impl Endpoint {
    /// All endpoints, in the order they are fetched for a node.
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Status,
        Endpoint::DebugStatus,
        Endpoint::SyncStatus,
        Endpoint::TrackedShards,
    ];

    /// Request path of the endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Status => "/status",
            Endpoint::DebugStatus => "/debug/api/status",
            Endpoint::SyncStatus => "/debug/api/sync_status",
            Endpoint::TrackedShards => "/debug/api/tracked_shards",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Client for the four per-node endpoints.
///
/// Cheap to clone, clones share one connection pool. Every call is a single
/// GET with no retry, a failure only affects the call it happened in.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> Result<(), near_peers_client::ClientError> {
/// use near_peers_client::{ClientConfiguration, NodeClient};
///
/// let client = NodeClient::new(ClientConfiguration::default())?;
/// let status = client.basic_status("35.192.7.154").await?;
/// println!("height {}", status.sync_info.latest_block_height);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    port: u16,
}

impl NodeClient {
    /// Create a client with the given configuration.
    ///
    /// # Returns
    ///
    /// * `Ok(NodeClient)` - The client.
    /// * `Err(ClientError)` - If the underlying HTTP client could not be built.
    pub fn new(config: ClientConfiguration) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, config.user_agent().clone());

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            port: config.port,
        })
    }

    /// URL of an endpoint on the node at `ip`.
    pub fn url(&self, ip: &str, endpoint: Endpoint) -> String {
        format!("http://{ip}:{}{}", self.port, endpoint.path())
    }

    /// Fetch `/status`.
    pub async fn basic_status(&self, ip: &str) -> Result<StatusResponse, ClientError> {
        self.get(ip, Endpoint::Status).await
    }

    /// Fetch `/debug/api/status`.
    pub async fn detailed_status(&self, ip: &str) -> Result<StatusResponse, ClientError> {
        self.get(ip, Endpoint::DebugStatus).await
    }

    /// Fetch `/debug/api/sync_status`.
    pub async fn sync_status(&self, ip: &str) -> Result<SyncStatusResponse, ClientError> {
        self.get(ip, Endpoint::SyncStatus).await
    }

    /// Fetch `/debug/api/tracked_shards`.
    pub async fn tracked_shards(&self, ip: &str) -> Result<TrackedShardsResponse, ClientError> {
        self.get(ip, Endpoint::TrackedShards).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        ip: &str,
        endpoint: Endpoint,
    ) -> Result<T, ClientError> {
        let url = self.url(ip, endpoint);
        debug!("GET {url}");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{url} responded with {status}");
            return Err(ClientError::Status { status, body });
        }

        // Shape mismatches are `Decode`, not `Transport`.
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
