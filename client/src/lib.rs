mod client;
mod configuration;
mod error;
mod views;

pub use client::{Endpoint, NodeClient};
pub use configuration::{
    default_user_agent, ClientConfiguration, UserAgentError, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RPC_PORT,
};
pub use error::ClientError;
pub use reqwest::StatusCode;
pub use views::{
    peer_ip, AccountData, BlockHeight, BlockStatusView, BuildInfo, CatchupStatusView,
    DetailedDebugStatus, DownloadStatusView, KnownProducerView, NetworkInfoView, PeerAddr,
    PeerInfoView, ShardSyncDownloadView, StatusResponse, StatusSyncInfo, SyncStatusEnvelope,
    SyncStatusResponse, SyncStatusView, TrackedShards, TrackedShardsEnvelope,
    TrackedShardsResponse, ValidatorInfo,
};
