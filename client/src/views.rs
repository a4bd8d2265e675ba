//! JSON views returned by the node status and debug endpoints.
//!
//! The shapes are owned by the node software. Only the fields the crawler and
//! its observers rely on are required, everything else falls back to a default
//! so that minor schema drift between node versions does not fail the call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Block height as reported by a node.
pub type BlockHeight = u64;

/// Response of `/status`, and of `/debug/api/status` which adds
/// [`DetailedDebugStatus`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub protocol_version: u32,
    #[serde(default)]
    pub latest_protocol_version: u32,
    #[serde(default)]
    pub node_key: Option<String>,
    #[serde(default)]
    pub node_public_key: String,
    #[serde(default)]
    pub rpc_addr: Option<String>,
    pub sync_info: StatusSyncInfo,
    #[serde(default)]
    pub uptime_sec: u64,
    /// Account this node validates for, `null` for non-validators.
    #[serde(default)]
    pub validator_account_id: Option<String>,
    #[serde(default)]
    pub validator_public_key: Option<String>,
    #[serde(default)]
    pub validators: Vec<ValidatorInfo>,
    #[serde(default)]
    pub version: BuildInfo,
    /// Only present on `/debug/api/status`.
    #[serde(default)]
    pub detailed_debug_status: Option<DetailedDebugStatus>,
}

impl StatusResponse {
    /// Network view of the node, if this is a detailed status.
    pub fn network_info(&self) -> Option<&NetworkInfoView> {
        self.detailed_debug_status
            .as_ref()
            .map(|status| &status.network_info)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSyncInfo {
    #[serde(default)]
    pub earliest_block_hash: Option<String>,
    #[serde(default)]
    pub earliest_block_height: Option<BlockHeight>,
    #[serde(default)]
    pub earliest_block_time: Option<String>,
    #[serde(default)]
    pub epoch_id: Option<String>,
    #[serde(default)]
    pub epoch_start_height: Option<BlockHeight>,
    #[serde(default)]
    pub latest_block_hash: String,
    pub latest_block_height: BlockHeight,
    #[serde(default)]
    pub latest_block_time: String,
    #[serde(default)]
    pub latest_state_root: String,
    #[serde(default)]
    pub syncing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub account_id: String,
    #[serde(default)]
    pub is_slashed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    #[serde(default)]
    pub build: String,
    #[serde(default)]
    pub rustc_version: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedDebugStatus {
    pub network_info: NetworkInfoView,
    #[serde(default)]
    pub sync_status: String,
    #[serde(default)]
    pub catchup_status: Vec<CatchupStatusView>,
    #[serde(default)]
    pub current_head_status: BlockStatusView,
    #[serde(default)]
    pub current_header_head_status: BlockStatusView,
    #[serde(default)]
    pub block_production_delay_millis: u64,
}

/// Connections of a node, the source of peer discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfoView {
    #[serde(default)]
    pub peer_max_count: u32,
    #[serde(default)]
    pub num_connected_peers: usize,
    #[serde(default)]
    pub connected_peers: Vec<PeerInfoView>,
    #[serde(default)]
    pub known_producers: Vec<KnownProducerView>,
    #[serde(default)]
    pub tier1_accounts_data: Vec<AccountData>,
    #[serde(default)]
    pub tier1_connections: Vec<PeerInfoView>,
}

impl NetworkInfoView {
    /// Addresses of all connected peers, regular connections first, then tier1.
    pub fn peer_addrs(&self) -> impl Iterator<Item = &str> {
        self.connected_peers
            .iter()
            .chain(self.tier1_connections.iter())
            .map(|peer| peer.addr.as_str())
    }

    /// Candidate node IPs derived from [`Self::peer_addrs`].
    ///
    /// May contain duplicates, a peer connected over both tiers shows up twice.
    /// Addresses without a host part are dropped.
    pub fn peer_ips(&self) -> Vec<&str> {
        self.peer_addrs()
            .map(peer_ip)
            .filter(|ip| !ip.is_empty())
            .collect()
    }
}

/// Host part of an `ip:port` peer address, everything before the first `:`.
///
/// # Example
///
/// ```
/// use near_peers_client::peer_ip;
///
/// assert_eq!(peer_ip("10.0.0.5:24567"), "10.0.0.5");
/// assert_eq!(peer_ip("10.0.0.5"), "10.0.0.5");
/// ```
pub fn peer_ip(addr: &str) -> &str {
    addr.split_once(':').map_or(addr, |(ip, _)| ip)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerInfoView {
    /// Address of the peer, `ip:port`.
    pub addr: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub height: Option<BlockHeight>,
    #[serde(default)]
    pub block_hash: Option<String>,
    #[serde(default)]
    pub is_highest_block_invalid: bool,
    #[serde(default)]
    pub tracked_shards: Vec<u64>,
    #[serde(default)]
    pub archival: bool,
    #[serde(default)]
    pub peer_id: String,
    #[serde(default)]
    pub received_bytes_per_sec: u64,
    #[serde(default)]
    pub sent_bytes_per_sec: u64,
    #[serde(default)]
    pub last_time_peer_requested_millis: u64,
    #[serde(default)]
    pub last_time_received_message_millis: u64,
    #[serde(default)]
    pub connection_established_time_millis: u64,
    #[serde(default)]
    pub is_outbound_peer: bool,
    #[serde(default)]
    pub nonce: u64,
}

impl PeerInfoView {
    /// Host part of [`Self::addr`].
    pub fn ip(&self) -> &str {
        peer_ip(&self.addr)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnownProducerView {
    pub account_id: String,
    #[serde(default)]
    pub peer_id: String,
    #[serde(default)]
    pub next_hops: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerAddr {
    pub addr: String,
    #[serde(default)]
    pub peer_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(default)]
    pub peer_id: String,
    #[serde(default)]
    pub proxies: Vec<PeerAddr>,
    #[serde(default)]
    pub account_key: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatchupStatusView {
    #[serde(default)]
    pub sync_block_hash: String,
    #[serde(default)]
    pub sync_block_height: BlockHeight,
    #[serde(default)]
    pub shard_sync_status: BTreeMap<u64, String>,
    #[serde(default)]
    pub blocks_to_catchup: Vec<BlockStatusView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockStatusView {
    #[serde(default)]
    pub height: BlockHeight,
    #[serde(default)]
    pub hash: String,
}

/// Sync state machine of a node.
///
/// Unit variants arrive as bare strings (`"NoSync"`), the others as a single
/// key object (`{"BodySync": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SyncStatusView {
    AwaitingPeers,
    NoSync,
    EpochSync {
        epoch_ord: u64,
    },
    HeaderSync {
        start_height: BlockHeight,
        current_height: BlockHeight,
        highest_height: BlockHeight,
    },
    /// Sync hash and per-shard download progress.
    StateSync(String, BTreeMap<u64, ShardSyncDownloadView>),
    StateSyncDone,
    BodySync {
        start_height: BlockHeight,
        current_height: BlockHeight,
        highest_height: BlockHeight,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardSyncDownloadView {
    #[serde(default)]
    pub downloads: Vec<DownloadStatusView>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStatusView {
    pub error: bool,
    pub done: bool,
}

/// Response of `/debug/api/sync_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    pub status_response: SyncStatusEnvelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusEnvelope {
    #[serde(rename = "SyncStatus")]
    pub sync_status: SyncStatusView,
}

impl SyncStatusResponse {
    pub fn new(status: SyncStatusView) -> Self {
        Self {
            status_response: SyncStatusEnvelope {
                sync_status: status,
            },
        }
    }

    pub fn status(&self) -> &SyncStatusView {
        &self.status_response.sync_status
    }
}

/// Response of `/debug/api/tracked_shards`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedShardsResponse {
    pub status_response: TrackedShardsEnvelope,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedShardsEnvelope {
    #[serde(rename = "TrackedShards")]
    pub tracked_shards: TrackedShards,
}

impl TrackedShardsResponse {
    pub fn new(tracked_shards: TrackedShards) -> Self {
        Self {
            status_response: TrackedShardsEnvelope { tracked_shards },
        }
    }

    pub fn tracked_shards(&self) -> &TrackedShards {
        &self.status_response.tracked_shards
    }
}

/// Shard tracking flags, indexed by shard number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedShards {
    pub shards_tracked_this_epoch: Vec<bool>,
    pub shards_tracked_next_epoch: Vec<bool>,
}

impl TrackedShards {
    /// Shard ids tracked in the current epoch.
    pub fn shards_this_epoch(&self) -> Vec<u64> {
        tracked_indices(&self.shards_tracked_this_epoch)
    }

    /// Shard ids that will be tracked in the next epoch.
    pub fn shards_next_epoch(&self) -> Vec<u64> {
        tracked_indices(&self.shards_tracked_next_epoch)
    }
}

fn tracked_indices(flags: &[bool]) -> Vec<u64> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, tracked)| **tracked)
        .map(|(shard, _)| shard as u64)
        .collect()
}
