//! Per-node state gathered during a crawl.

use near_peers_client::{
    BlockHeight, ClientError, StatusResponse, SyncStatusResponse, TrackedShardsResponse,
};
use std::sync::Arc;

/// State of one endpoint call for one node.
///
/// Starts as [`Fetch::Pending`] and settles exactly once.
#[derive(Debug, Clone)]
pub enum Fetch<T> {
    /// The call has not completed yet.
    Pending,
    /// The call succeeded with this payload.
    Ready(T),
    /// The call failed. Failures are permanent for the run.
    Failed(Arc<ClientError>),
}

impl<T> Fetch<T> {
    /// Whether the call has not completed yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, Fetch::Pending)
    }

    /// Whether the call completed, successfully or not.
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// The payload, if the call succeeded.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Fetch::Ready(payload) => Some(payload),
            _ => None,
        }
    }

    /// The error, if the call failed.
    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Fetch::Failed(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Settle a pending slot.
    ///
    /// # Returns
    ///
    /// `true` if the slot was pending and now holds `result`, `false` if it had
    /// already settled, in which case `result` is discarded.
    pub(crate) fn settle(&mut self, result: Result<T, ClientError>) -> bool {
        if self.is_settled() {
            return false;
        }
        *self = result.into();
        true
    }
}

impl<T> Default for Fetch<T> {
    fn default() -> Self {
        Fetch::Pending
    }
}

impl<T> From<Result<T, ClientError>> for Fetch<T> {
    fn from(result: Result<T, ClientError>) -> Self {
        match result {
            Ok(payload) => Fetch::Ready(payload),
            Err(err) => Fetch::Failed(Arc::new(err)),
        }
    }
}

/// A discovered node and the latest payload of each of its endpoints.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    ip: String,
    pub(crate) basic_status: Fetch<StatusResponse>,
    pub(crate) detailed_status: Fetch<StatusResponse>,
    pub(crate) sync_status: Fetch<SyncStatusResponse>,
    pub(crate) tracked_shards: Fetch<TrackedShardsResponse>,
}

impl NodeRecord {
    pub(crate) fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            basic_status: Fetch::Pending,
            detailed_status: Fetch::Pending,
            sync_status: Fetch::Pending,
            tracked_shards: Fetch::Pending,
        }
    }

    /// IP of the node, its identity within a crawl.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Result of `/status`.
    pub fn basic_status(&self) -> &Fetch<StatusResponse> {
        &self.basic_status
    }

    /// Result of `/debug/api/status`.
    pub fn detailed_status(&self) -> &Fetch<StatusResponse> {
        &self.detailed_status
    }

    /// Result of `/debug/api/sync_status`.
    pub fn sync_status(&self) -> &Fetch<SyncStatusResponse> {
        &self.sync_status
    }

    /// Result of `/debug/api/tracked_shards`.
    pub fn tracked_shards(&self) -> &Fetch<TrackedShardsResponse> {
        &self.tracked_shards
    }

    /// Latest block height from the basic status.
    pub fn height(&self) -> Option<BlockHeight> {
        self.basic_status
            .ready()
            .map(|status| status.sync_info.latest_block_height)
    }

    /// Validator account from the basic status, `None` for non-validators.
    pub fn validator_account_id(&self) -> Option<&str> {
        self.basic_status
            .ready()
            .and_then(|status| status.validator_account_id.as_deref())
    }

    /// Whether all four endpoint calls have settled.
    pub fn is_settled(&self) -> bool {
        self.basic_status.is_settled()
            && self.detailed_status.is_settled()
            && self.sync_status.is_settled()
            && self.tracked_shards.is_settled()
    }
}
