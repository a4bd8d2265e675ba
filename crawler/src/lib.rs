//! Discovery crawler for the NEAR node network.
//!
//! Starting from a seed IP, the crawler fetches each node's status and debug
//! endpoints and follows its peer connections until no new nodes turn up.

mod builder;
mod crawler;
mod discovery;
mod endpoints;
mod record;
mod session;

pub use builder::{CrawlerBuilder, CrawlerBuilderError};
pub use crawler::Crawler;
pub use discovery::{DiscoverySet, Notifier};
pub use endpoints::NodeEndpoints;
pub use record::{Fetch, NodeRecord};

// Re-exports.
pub use near_peers_client::{
    BlockHeight, ClientConfiguration, ClientError, Endpoint, NodeClient, StatusResponse,
    SyncStatusResponse, SyncStatusView, TrackedShardsResponse, UserAgentError,
};
