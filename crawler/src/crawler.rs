use crate::discovery::{DiscoverySet, Notifier};
use crate::endpoints::NodeEndpoints;
use crate::session::CrawlSession;
use near_peers_client::NodeClient;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A crawler for the NEAR node network.
///
/// The crawler fetches the status and debug endpoints of every node it knows
/// about and follows each node's peer connections to find more. Every change
/// to the discovered state fires the notifier the crawler was built with,
/// observers then read [`Crawler::nodes`].
///
/// Built with [`crate::CrawlerBuilder`]. Dropping the crawler stops it, workers
/// already running finish their calls but nothing new is started.
pub struct Crawler<C = NodeClient> {
    session: Arc<CrawlSession<C>>,
    coordinator: JoinHandle<()>,
}

impl<C: NodeEndpoints> Crawler<C> {
    /// Spawn the coordinator of a new crawl.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new(client: C, notifier: Notifier, max_concurrent_nodes: usize) -> Self {
        let nodes = Arc::new(DiscoverySet::with_notifier(notifier));
        let (session, queue_rx) = CrawlSession::new(client, nodes);
        let session = Arc::new(session);

        let coordinator = tokio::spawn(
            session
                .clone()
                .coordinate(queue_rx, max_concurrent_nodes.max(1)),
        );

        Crawler {
            session,
            coordinator,
        }
    }

    /// Add a node to the crawl.
    ///
    /// Known IPs are ignored. A new IP gets a [`crate::NodeRecord`] right away,
    /// the notifier fires, and the node is queued for fetching.
    ///
    /// # Arguments
    ///
    /// * `ip` - Address of the node, without port.
    ///
    /// # Returns
    ///
    /// `true` if the IP was new, `false` if it was already known.
    pub fn add_node(&self, ip: impl AsRef<str>) -> bool {
        self.session.add_node(ip.as_ref())
    }

    /// The discovered nodes.
    pub fn nodes(&self) -> &DiscoverySet {
        self.session.nodes()
    }

    /// Wait until every known node has been fetched and expanded.
    ///
    /// Resolves immediately if nothing is in flight. A node that never answers
    /// keeps the crawl busy until its calls time out, or forever if the request
    /// timeout was disabled.
    pub async fn exhausted(&self) {
        self.session.exhausted().await
    }

    /// Crawl the network starting from a seed node.
    ///
    /// # Termination
    ///
    /// Returns once no new nodes are being discovered and every discovered node
    /// has settled all four of its endpoints. Deduplication of IPs is the only
    /// bound on the crawl.
    ///
    /// # Arguments
    ///
    /// * `seed` - IP of the node to start from.
    pub async fn crawl(&self, seed: impl AsRef<str>) {
        self.add_node(seed);
        self.exhausted().await
    }
}

impl<C> Drop for Crawler<C> {
    fn drop(&mut self) {
        self.coordinator.abort();
    }
}

impl<C> fmt::Debug for Crawler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("nodes", self.session.nodes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::test_utils::{CallEvent, MockNode, MockNodeClient};
    use near_peers_client::{ClientError, Endpoint};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn new_crawler(
        client: MockNodeClient,
        max_concurrent_nodes: usize,
    ) -> (Crawler<MockNodeClient>, Arc<AtomicUsize>) {
        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        let notifier: Notifier = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (Crawler::new(client, notifier, max_concurrent_nodes), notifications)
    }

    fn ips(crawler: &Crawler<MockNodeClient>) -> Vec<String> {
        crawler
            .nodes()
            .records()
            .iter()
            .map(|record| record.ip().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_seed_with_one_peer() {
        let client = MockNodeClient::new();
        client.add_node("1.2.3.4", MockNode::healthy(100, &["1.2.3.5:24567"]));
        client.add_node("1.2.3.5", MockNode::healthy(99, &["1.2.3.4:24567"]));
        let (crawler, _) = new_crawler(client.clone(), 8);

        crawler.crawl("1.2.3.4").await;

        assert_eq!(ips(&crawler), vec!["1.2.3.4", "1.2.3.5"]);
        let seed = crawler.nodes().record("1.2.3.4").unwrap();
        assert_eq!(seed.height(), Some(100));
        assert_eq!(seed.validator_account_id(), None);
        assert!(seed.is_settled());

        assert_eq!(client.calls("1.2.3.5", Endpoint::Status), 1);
        assert_eq!(client.calls("1.2.3.4", Endpoint::Status), 1);
        assert!(!crawler.add_node("1.2.3.5"));
    }

    #[tokio::test]
    async fn test_unreachable_seed_still_attempts_debug_calls() {
        let client = MockNodeClient::new();
        let (crawler, notifications) = new_crawler(client.clone(), 8);

        crawler.crawl("1.2.3.4").await;

        let seed = crawler.nodes().record("1.2.3.4").unwrap();
        assert!(matches!(
            seed.basic_status().error(),
            Some(ClientError::Transport(_))
        ));
        for endpoint in Endpoint::ALL {
            assert_eq!(client.calls("1.2.3.4", endpoint), 1, "{endpoint}");
        }
        assert!(seed.detailed_status().error().is_some());
        assert!(seed.sync_status().error().is_some());
        assert!(seed.tracked_shards().error().is_some());
        assert_eq!(crawler.nodes().len(), 1);
        // Added plus four settled slots.
        assert_eq!(notifications.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_panicking_notifier_does_not_stall_crawl() {
        let client = MockNodeClient::new();
        client.add_node("1.2.3.4", MockNode::healthy(100, &["1.2.3.5:24567"]));

        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        let notifier: Notifier = Arc::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 3 {
                panic!("observer failed");
            }
        });
        let crawler = Crawler::new(client, notifier, 8);

        let finished =
            tokio::time::timeout(Duration::from_secs(2), crawler.crawl("1.2.3.4")).await;

        assert!(finished.is_ok(), "crawl never exhausted");
        assert_eq!(ips(&crawler), vec!["1.2.3.4", "1.2.3.5"]);
        assert!(crawler.nodes().records().iter().all(|r| r.is_settled()));
        // Two claims plus four settled slots each, the panicking call included.
        assert_eq!(notifications.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_expansion_from_connected_and_tier1_peers() {
        let client = MockNodeClient::new();
        client.add_node(
            "10.0.0.1",
            MockNode::healthy(5, &["10.0.0.5:24567"]).with_tier1(&["10.0.0.9:24567"]),
        );
        let (crawler, _) = new_crawler(client.clone(), 8);

        crawler.crawl("10.0.0.1").await;

        assert_eq!(ips(&crawler), vec!["10.0.0.1", "10.0.0.5", "10.0.0.9"]);
        assert_eq!(client.calls("10.0.0.5", Endpoint::Status), 1);
        assert_eq!(client.calls("10.0.0.9", Endpoint::Status), 1);
        // Unknown to the mock, so they failed, and expanded nothing further.
        assert!(crawler
            .nodes()
            .record("10.0.0.9")
            .unwrap()
            .basic_status()
            .error()
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_fully_connected_network_is_visited_once() {
        let all: Vec<String> = (1..=12).map(|n| format!("10.0.1.{n}:24567")).collect();
        let addrs: Vec<&str> = all.iter().map(String::as_str).collect();

        let client = MockNodeClient::new().with_delay(Duration::from_millis(5));
        for n in 1..=12 {
            client.add_node(&format!("10.0.1.{n}"), MockNode::healthy(n, &addrs));
        }
        let (crawler, notifications) = new_crawler(client.clone(), 6);

        crawler.crawl("10.0.1.1").await;

        assert_eq!(crawler.nodes().len(), 12);
        for n in 1..=12 {
            let ip = format!("10.0.1.{n}");
            for endpoint in Endpoint::ALL {
                assert_eq!(client.calls(&ip, endpoint), 1, "{ip} {endpoint}");
            }
        }
        assert_eq!(notifications.load(Ordering::SeqCst), 12 * 5);
        assert_eq!(crawler.nodes().highest_height(), Some(12));
    }

    #[tokio::test]
    async fn test_debug_calls_wait_for_basic_status() {
        let client = MockNodeClient::new().with_delay(Duration::from_millis(2));
        client.add_node(
            "10.0.2.1",
            MockNode::healthy(1, &["10.0.2.2:1", "10.0.2.3:1"]),
        );
        client.add_node(
            "10.0.2.2",
            MockNode::healthy(1, &["10.0.2.3:1"]).failing(Endpoint::Status),
        );
        client.add_node("10.0.2.3", MockNode::healthy(1, &[]));
        let (crawler, _) = new_crawler(client.clone(), 8);

        crawler.crawl("10.0.2.1").await;

        let events = client.events();
        for ip in ["10.0.2.1", "10.0.2.2", "10.0.2.3"] {
            let basic_done = events
                .iter()
                .position(|(i, e, ev)| {
                    i == ip && *e == Endpoint::Status && *ev == CallEvent::Finished
                })
                .unwrap();
            for (index, (i, e, ev)) in events.iter().enumerate() {
                if i == ip && *e != Endpoint::Status && *ev == CallEvent::Started {
                    assert!(index > basic_done, "{ip} {e} started before basic status settled");
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failures_stay_in_their_slot() {
        let client = MockNodeClient::new();
        client.add_node(
            "10.0.3.1",
            MockNode::healthy(7, &["10.0.3.2:24567"]).failing(Endpoint::SyncStatus),
        );
        client.add_node(
            "10.0.3.2",
            MockNode::healthy(7, &[]).failing(Endpoint::TrackedShards),
        );
        let (crawler, _) = new_crawler(client, 8);

        crawler.crawl("10.0.3.1").await;

        let first = crawler.nodes().record("10.0.3.1").unwrap();
        assert!(first.basic_status().ready().is_some());
        assert!(first.detailed_status().ready().is_some());
        assert!(first.sync_status().error().is_some());
        assert!(first.tracked_shards().ready().is_some());

        let second = crawler.nodes().record("10.0.3.2").unwrap();
        assert!(second.basic_status().ready().is_some());
        assert!(second.detailed_status().ready().is_some());
        assert!(second.sync_status().ready().is_some());
        assert!(second.tracked_shards().error().is_some());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        // A star: the seed knows twenty leaves which know nobody.
        let leaves: Vec<String> = (1..=20).map(|n| format!("10.0.4.{n}:24567")).collect();
        let addrs: Vec<&str> = leaves.iter().map(String::as_str).collect();

        let client = MockNodeClient::new().with_delay(Duration::from_millis(5));
        client.add_node("10.0.4.100", MockNode::healthy(1, &addrs));
        for n in 1..=20 {
            client.add_node(&format!("10.0.4.{n}"), MockNode::healthy(1, &[]));
        }
        let (crawler, _) = new_crawler(client.clone(), 3);

        crawler.crawl("10.0.4.100").await;

        assert_eq!(crawler.nodes().len(), 21);
        assert!(crawler.nodes().records().iter().all(|r| r.is_settled()));
        assert!(client.max_in_flight_nodes() <= 3);
    }

    #[tokio::test]
    async fn test_add_node_while_idle_resumes_crawl() {
        let client = MockNodeClient::new();
        client.add_node("10.0.5.1", MockNode::healthy(1, &[]));
        client.add_node("10.0.5.2", MockNode::healthy(2, &["10.0.5.3:24567"]));
        client.add_node("10.0.5.3", MockNode::healthy(3, &[]));
        let (crawler, _) = new_crawler(client, 8);

        // Nothing added yet.
        crawler.exhausted().await;
        assert!(crawler.nodes().is_empty());

        crawler.crawl("10.0.5.1").await;
        assert_eq!(crawler.nodes().len(), 1);

        assert!(crawler.add_node("10.0.5.2"));
        crawler.exhausted().await;
        assert_eq!(ips(&crawler), vec!["10.0.5.1", "10.0.5.2", "10.0.5.3"]);
        assert_eq!(crawler.nodes().highest_height(), Some(3));
    }

    #[tokio::test]
    async fn test_debug_lists_discovered_nodes() {
        let client = MockNodeClient::new();
        client.add_node("10.0.6.1", MockNode::healthy(1, &[]));
        let (crawler, _) = new_crawler(client, 8);

        crawler.crawl("10.0.6.1").await;

        let formatted = format!("{crawler:?}");
        assert!(formatted.starts_with("Crawler"));
        assert!(formatted.contains("10.0.6.1"));
    }
}
