//! Node endpoint abstraction for testing and mocking.
//!
//! This module provides the [`NodeEndpoints`] trait that abstracts the four
//! per-node calls, so the crawl logic can be driven by a mock in tests.

use near_peers_client::{
    ClientError, NodeClient, StatusResponse, SyncStatusResponse, TrackedShardsResponse,
};
use std::future::Future;

/// The four remote calls made for every discovered node.
///
/// Each call settles independently, an error in one never affects another.
pub trait NodeEndpoints: Clone + Send + Sync + 'static {
    /// Fetch `/status`, the liveness probe.
    fn basic_status(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<StatusResponse, ClientError>> + Send;

    /// Fetch `/debug/api/status`, which carries the peer lists.
    fn detailed_status(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<StatusResponse, ClientError>> + Send;

    /// Fetch `/debug/api/sync_status`.
    fn sync_status(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<SyncStatusResponse, ClientError>> + Send;

    /// Fetch `/debug/api/tracked_shards`.
    fn tracked_shards(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<TrackedShardsResponse, ClientError>> + Send;
}

/// Implementation of NodeEndpoints for the NodeClient type from near-peers-client.
impl NodeEndpoints for NodeClient {
    fn basic_status(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<StatusResponse, ClientError>> + Send {
        self.basic_status(ip)
    }

    fn detailed_status(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<StatusResponse, ClientError>> + Send {
        self.detailed_status(ip)
    }

    fn sync_status(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<SyncStatusResponse, ClientError>> + Send {
        self.sync_status(ip)
    }

    fn tracked_shards(
        &self,
        ip: &str,
    ) -> impl Future<Output = Result<TrackedShardsResponse, ClientError>> + Send {
        self.tracked_shards(ip)
    }
}
