//! Builder pattern for configuring and creating crawler instances.

use crate::crawler::Crawler;
use crate::discovery::Notifier;
use crate::endpoints::NodeEndpoints;
use near_peers_client::{ClientConfiguration, ClientError, NodeClient, UserAgentError};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default maximum number of nodes fetched concurrently.
const DEFAULT_MAX_CONCURRENT_NODES: usize = 8;

/// Errors that can occur during crawler configuration.
#[derive(Debug)]
pub enum CrawlerBuilderError {
    /// User agent is not a valid header value.
    InvalidUserAgent(UserAgentError),
    /// The HTTP client could not be created.
    Client(ClientError),
}

impl fmt::Display for CrawlerBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlerBuilderError::InvalidUserAgent(err) => {
                write!(f, "Invalid user agent: {err}")
            }
            CrawlerBuilderError::Client(err) => {
                write!(f, "Failed to create HTTP client: {err}")
            }
        }
    }
}

impl std::error::Error for CrawlerBuilderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CrawlerBuilderError::InvalidUserAgent(err) => Some(err),
            CrawlerBuilderError::Client(err) => Some(err),
        }
    }
}

/// Builder for creating a customized [`Crawler`] instance.
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), near_peers_crawler::CrawlerBuilderError> {
/// use near_peers_crawler::CrawlerBuilder;
/// use std::time::Duration;
///
/// // Create a crawler with default settings
/// let basic_crawler = CrawlerBuilder::new().build(|| {})?;
///
/// // Create a crawler with custom settings
/// let custom_crawler = CrawlerBuilder::new()
///     .with_user_agent("my-monitor/1.0")?
///     .with_port(3030)
///     .with_request_timeout(Duration::from_secs(5))
///     .with_max_concurrent_nodes(32)
///     .build(|| println!("nodes changed"))?;
///
/// custom_crawler.crawl("35.192.7.154").await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CrawlerBuilder {
    /// Configuration of the HTTP client used for every node.
    client_config: ClientConfiguration,
    /// Maximum number of nodes fetched concurrently.
    max_concurrent_nodes: usize,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlerBuilder {
    /// Create a new crawler builder with default settings.
    ///
    /// # Returns
    ///
    /// A new `CrawlerBuilder` instance.
    pub fn new() -> Self {
        CrawlerBuilder {
            client_config: ClientConfiguration::default(),
            max_concurrent_nodes: DEFAULT_MAX_CONCURRENT_NODES,
        }
    }

    /// Set a custom user agent string for the crawler's requests.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - The user agent string to use.
    ///
    /// # Returns
    ///
    /// * `Ok(Self)` - The builder for method chaining if validation succeeds.
    /// * `Err(CrawlerBuilderError)` - If the user agent is not a valid header value.
    pub fn with_user_agent<S: AsRef<str>>(
        mut self,
        user_agent: S,
    ) -> Result<Self, CrawlerBuilderError> {
        self.client_config = self
            .client_config
            .with_user_agent(user_agent)
            .map_err(CrawlerBuilderError::InvalidUserAgent)?;
        Ok(self)
    }

    /// Set the RPC port of the nodes.
    ///
    /// Peer addresses carry the p2p port, not the RPC port, so a single port is
    /// assumed for the whole network.
    ///
    /// # Arguments
    ///
    /// * `port` - The RPC port (defaults to 3030).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_port(mut self, port: u16) -> Self {
        self.client_config = self.client_config.with_port(port);
        self
    }

    /// Set the timeout for each endpoint call.
    ///
    /// A call that takes longer settles as failed. A longer timeout may help on
    /// slow networks, while a shorter one lets a crawl with unresponsive nodes
    /// finish sooner.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum time to wait for one call (defaults to 10 seconds).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.client_config = self.client_config.with_request_timeout(Some(timeout));
        self
    }

    /// Disable the per-call timeout.
    ///
    /// A node that accepts the connection but never answers then keeps its
    /// slots pending, and the crawl never exhausts.
    pub fn without_request_timeout(mut self) -> Self {
        self.client_config = self.client_config.with_request_timeout(None);
        self
    }

    /// Set the maximum number of nodes fetched concurrently.
    ///
    /// Each node in flight issues up to three requests at once.
    ///
    /// # Recommendations
    ///
    /// * **Conservative (1-4)** - For slow networks or resource-constrained environments.
    /// * **Default (8)** - Good balance for most use cases.
    /// * **Aggressive (16-64)** - For fast crawling of large networks.
    ///
    /// # Arguments
    ///
    /// * `max_nodes` - Maximum concurrent nodes (defaults to 8, at least 1).
    ///
    /// # Returns
    ///
    /// Self for method chaining.
    pub fn with_max_concurrent_nodes(mut self, max_nodes: usize) -> Self {
        self.max_concurrent_nodes = max_nodes.max(1);
        self
    }

    /// Build the crawler over HTTP with the configured options.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `notifier` - Called after every change to the discovered nodes.
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - A configured crawler, idle until a node is added.
    /// * `Err(CrawlerBuilderError)` - If the HTTP client could not be created.
    pub fn build<F>(self, notifier: F) -> Result<Crawler<NodeClient>, CrawlerBuilderError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let client =
            NodeClient::new(self.client_config.clone()).map_err(CrawlerBuilderError::Client)?;
        Ok(self.build_with_client(client, notifier))
    }

    /// Build the crawler over a custom [`NodeEndpoints`] implementation.
    ///
    /// The client-related options of this builder are ignored.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build_with_client<C, F>(self, client: C, notifier: F) -> Crawler<C>
    where
        C: NodeEndpoints,
        F: Fn() + Send + Sync + 'static,
    {
        let notifier: Notifier = Arc::new(notifier);
        Crawler::new(client, notifier, self.max_concurrent_nodes)
    }
}
