//! The set of discovered nodes and the notifier observing it.

use crate::record::{Fetch, NodeRecord};
use log::{debug, warn};
use near_peers_client::{
    BlockHeight, ClientError, StatusResponse, SyncStatusResponse, TrackedShardsResponse,
};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Zero-argument callback fired on every observable change of a [`DiscoverySet`].
pub type Notifier = Arc<dyn Fn() + Send + Sync>;

/// Every node discovered during a crawl, in discovery order.
///
/// All mutation is serialized behind one lock. Claiming an IP checks and
/// inserts under a single acquisition, so concurrent discoveries of the same
/// IP create exactly one [`NodeRecord`].
///
/// The notifier runs after the lock is released, on the task that made the
/// change, and may read the set freely.
pub struct DiscoverySet {
    state: Mutex<DiscoveryState>,
    notifier: Notifier,
}

#[derive(Default)]
struct DiscoveryState {
    /// Known IPs and the index of their record.
    known_ips: HashMap<String, usize>,
    records: Vec<NodeRecord>,
}

impl DiscoverySet {
    /// Create an empty set reporting changes to `notifier`.
    pub fn new<F>(notifier: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_notifier(Arc::new(notifier))
    }

    pub(crate) fn with_notifier(notifier: Notifier) -> Self {
        Self {
            state: Mutex::new(DiscoveryState::default()),
            notifier,
        }
    }

    // State is consistent between statements, a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, DiscoveryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the notifier. A panicking notifier is logged and otherwise ignored,
    /// it never interrupts the crawl.
    fn notify(&self) {
        if panic::catch_unwind(AssertUnwindSafe(|| (self.notifier)())).is_err() {
            warn!("Change notifier panicked");
        }
    }

    /// Claim `ip` as a new crawl target.
    ///
    /// # Returns
    ///
    /// `true` if the IP was unknown, in which case a record was appended and
    /// the notifier fired. `false` if it was already known, nothing changes.
    pub(crate) fn try_claim(&self, ip: &str) -> bool {
        {
            let mut state = self.lock();
            if state.known_ips.contains_key(ip) {
                return false;
            }
            let index = state.records.len();
            state.known_ips.insert(ip.to_string(), index);
            state.records.push(NodeRecord::new(ip));
        }
        debug!("Discovered node {ip}");
        self.notify();
        true
    }

    pub(crate) fn settle_basic_status(
        &self,
        ip: &str,
        result: Result<StatusResponse, ClientError>,
    ) -> bool {
        self.settle(ip, result, |record| &mut record.basic_status)
    }

    pub(crate) fn settle_detailed_status(
        &self,
        ip: &str,
        result: Result<StatusResponse, ClientError>,
    ) -> bool {
        self.settle(ip, result, |record| &mut record.detailed_status)
    }

    pub(crate) fn settle_sync_status(
        &self,
        ip: &str,
        result: Result<SyncStatusResponse, ClientError>,
    ) -> bool {
        self.settle(ip, result, |record| &mut record.sync_status)
    }

    pub(crate) fn settle_tracked_shards(
        &self,
        ip: &str,
        result: Result<TrackedShardsResponse, ClientError>,
    ) -> bool {
        self.settle(ip, result, |record| &mut record.tracked_shards)
    }

    /// Store `result` in the slot picked by `slot` and notify if it changed.
    fn settle<T>(
        &self,
        ip: &str,
        result: Result<T, ClientError>,
        slot: impl FnOnce(&mut NodeRecord) -> &mut Fetch<T>,
    ) -> bool {
        let changed = {
            let mut state = self.lock();
            let DiscoveryState { known_ips, records } = &mut *state;
            match known_ips.get(ip).and_then(|&index| records.get_mut(index)) {
                Some(record) => slot(record).settle(result),
                None => false,
            }
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// Snapshot of all records in discovery order.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.lock().records.clone()
    }

    /// Snapshot of the record for `ip`.
    pub fn record(&self, ip: &str) -> Option<NodeRecord> {
        let state = self.lock();
        state
            .known_ips
            .get(ip)
            .and_then(|&index| state.records.get(index))
            .cloned()
    }

    /// Whether `ip` has been claimed.
    pub fn contains(&self, ip: &str) -> bool {
        self.lock().known_ips.contains_key(ip)
    }

    /// Number of discovered nodes.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether no node has been discovered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest block height reported by any node's basic status.
    pub fn highest_height(&self) -> Option<BlockHeight> {
        self.lock()
            .records
            .iter()
            .filter_map(NodeRecord::height)
            .max()
    }
}

impl fmt::Debug for DiscoverySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("DiscoverySet")
            .field("records", &state.records)
            .finish_non_exhaustive()
    }
}
