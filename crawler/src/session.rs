//! Internal session coordination for crawling operations.
//!
//! This module contains the [`CrawlSession`] which orchestrates the crawling process
//! by managing the work queue and coordinating concurrent node workers.

use crate::discovery::DiscoverySet;
use crate::endpoints::NodeEndpoints;
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Result of processing a single node in the crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskResult {
    /// Detailed status listed peers, this many of them were new.
    Expanded(usize),
    /// Detailed status failed or carried no network info.
    NoPeerList,
    /// The worker panicked before finishing.
    Unwound,
}

/// Marks a worker's node as finished and reports to the coordinator when
/// dropped, so a panicking worker still releases its slot.
struct WorkerGuard<C> {
    session: Arc<CrawlSession<C>>,
    done_tx: mpsc::Sender<TaskResult>,
    result: TaskResult,
}

impl<C> WorkerGuard<C> {
    fn new(session: Arc<CrawlSession<C>>, done_tx: mpsc::Sender<TaskResult>) -> Self {
        Self {
            session,
            done_tx,
            result: TaskResult::Unwound,
        }
    }
}

impl<C> Drop for WorkerGuard<C> {
    fn drop(&mut self) {
        self.session.finish_node();
        // Capacity matches the worker cap and every worker sends once.
        // Coordinator may have been aborted, nothing left to report to.
        let _ = self.done_tx.try_send(self.result);
    }
}

/// Internal coordinator for a crawling session.
///
/// # Architecture
///
/// The session follows a producer-consumer pattern.
///
/// * **Claimers** (`add_node()`) - Claim an IP in the [`DiscoverySet`] and queue it.
/// * **Coordinator** (`coordinate()`) - Pulls queued IPs and spawns workers, at most
///   `max_concurrent_nodes` at a time.
/// * **Workers** (`process()`) - Fetch one node's endpoints and claim its peers.
///
/// Claiming happens before queueing, so every queued IP is processed once.
pub(crate) struct CrawlSession<C> {
    client: C,
    nodes: Arc<DiscoverySet>,
    /// Claimed IPs waiting for a worker.
    queue_tx: mpsc::UnboundedSender<String>,
    /// Claimed nodes whose worker has not finished yet.
    in_flight: watch::Sender<usize>,
}

impl<C> CrawlSession<C> {
    pub(crate) fn nodes(&self) -> &DiscoverySet {
        &self.nodes
    }

    /// Wait until every claimed node has been processed.
    pub(crate) async fn exhausted(&self) {
        let mut in_flight = self.in_flight.subscribe();
        // The sender lives as long as the session, so this only errs on teardown.
        let _ = in_flight.wait_for(|count| *count == 0).await;
    }

    fn finish_node(&self) {
        let mut remaining = 0;
        self.in_flight.send_modify(|count| {
            *count -= 1;
            remaining = *count;
        });
        if remaining == 0 {
            info!("Crawler exhausted - {} nodes discovered", self.nodes.len());
        }
    }
}

impl<C: NodeEndpoints> CrawlSession<C> {
    /// Create a new session and the receiving end of its work queue.
    pub(crate) fn new(
        client: C,
        nodes: Arc<DiscoverySet>,
    ) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (in_flight, _) = watch::channel(0);
        let session = Self {
            client,
            nodes,
            queue_tx,
            in_flight,
        };
        (session, queue_rx)
    }

    /// Claim `ip` and queue it for a worker.
    ///
    /// # Returns
    ///
    /// `true` if the IP was new, `false` if it was already known.
    pub(crate) fn add_node(&self, ip: &str) -> bool {
        if !self.nodes.try_claim(ip) {
            return false;
        }

        self.in_flight.send_modify(|count| *count += 1);
        if self.queue_tx.send(ip.to_string()).is_err() {
            // Coordinator is gone, the record stays pending.
            debug!("Crawl stopped, not processing {ip}");
            self.finish_node();
        }
        true
    }

    /// Processes a single node: fetches its endpoints and claims its peers.
    ///
    /// Basic status goes first. The other three calls are issued once it has
    /// settled, whatever the outcome, and run concurrently.
    ///
    /// # Arguments
    ///
    /// * `ip` - The node to fetch, already claimed.
    ///
    /// # Returns
    ///
    /// A `TaskResult` indicating whether the node expanded the crawl.
    async fn process(&self, ip: String) -> TaskResult {
        debug!("Processing node {ip}");

        let basic = self.client.basic_status(&ip).await;
        if let Err(e) = &basic {
            debug!("Basic status of {ip} failed: {e}");
        }
        self.nodes.settle_basic_status(&ip, basic);

        let detailed = async {
            let result = self.client.detailed_status(&ip).await;
            let peers = match &result {
                Ok(status) => status.network_info().map(|info| {
                    info.peer_ips()
                        .into_iter()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                }),
                Err(e) => {
                    debug!("Detailed status of {ip} failed: {e}");
                    None
                }
            };
            self.nodes.settle_detailed_status(&ip, result);

            match peers {
                Some(peers) => {
                    let new_peers = peers.iter().filter(|peer| self.add_node(peer)).count();
                    debug!("{ip} reported {} peers, {new_peers} new", peers.len());
                    TaskResult::Expanded(new_peers)
                }
                None => TaskResult::NoPeerList,
            }
        };

        let sync = async {
            let result = self.client.sync_status(&ip).await;
            if let Err(e) = &result {
                debug!("Sync status of {ip} failed: {e}");
            }
            self.nodes.settle_sync_status(&ip, result);
        };

        let shards = async {
            let result = self.client.tracked_shards(&ip).await;
            if let Err(e) = &result {
                debug!("Tracked shards of {ip} failed: {e}");
            }
            self.nodes.settle_tracked_shards(&ip, result);
        };

        let (result, (), ()) = tokio::join!(detailed, sync, shards);
        result
    }

    /// Coordinates the crawling process by managing the work queue and task scheduling.
    ///
    /// This is the main control loop of the session. It pulls claimed IPs from the
    /// queue and spawns a worker for each, never running more than
    /// `max_concurrent_nodes` workers at once. The session keeps its own queue
    /// sender, so the loop runs until its task is aborted.
    pub(crate) async fn coordinate(
        self: Arc<Self>,
        mut queue_rx: mpsc::UnboundedReceiver<String>,
        max_concurrent_nodes: usize,
    ) {
        // Channel to track task completion.
        let (task_done_tx, mut task_done_rx) = mpsc::channel::<TaskResult>(max_concurrent_nodes);

        // Number of in-flight workers.
        let mut active_tasks = 0;

        let mut last_log_time = Instant::now();
        let log_interval = Duration::from_secs(60);

        loop {
            // Periodic status logging, only evaluated when something happens.
            if last_log_time.elapsed() >= log_interval {
                info!(
                    "{} active workers (max: {}), {} nodes discovered",
                    active_tasks,
                    max_concurrent_nodes,
                    self.nodes.len()
                );
                last_log_time = Instant::now();
            }

            tokio::select! {
                // Take new work only while below the concurrency cap.
                ip = queue_rx.recv(), if active_tasks < max_concurrent_nodes => {
                    let Some(ip) = ip else {
                        debug!("Work queue closed, stopping coordinator");
                        break;
                    };

                    let session = self.clone();
                    let done_tx = task_done_tx.clone();

                    active_tasks += 1;
                    tokio::spawn(async move {
                        let mut guard = WorkerGuard::new(session.clone(), done_tx);
                        guard.result = session.process(ip).await;
                    });
                }
                // Worker completed.
                Some(result) = task_done_rx.recv(), if active_tasks > 0 => {
                    active_tasks -= 1;
                    debug!("Worker completed with result: {result:?}");
                }
            }
        }
    }
}
