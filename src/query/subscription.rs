//! Live range subscriptions against the ordered store.
//!
//! Each subscribed range runs in its own task that scans the store and
//! forwards decoded changes to the coordinator over one shared channel. The
//! manager only ever changes its range set as a whole: ranges that left the
//! set are cancelled and joined before new ones are started.

use super::QueryStats;
use crate::compute::GeoHashRange;
use crate::error::GeoRangeError;
use crate::store::{LocationRecord, OrderedStore, SORT_FIELD, StoreEvent};
use futures::{FutureExt, StreamExt};
use georange_types::Location;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identifies one subscription of one range. A range that is dropped and
/// later planned again gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[cfg(test)]
    pub(crate) const fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decoded record change.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemChange {
    Added { key: String, location: Location },
    Changed { key: String, location: Location },
    Removed { key: String },
}

#[derive(Debug)]
pub(crate) enum NotificationKind {
    /// The store acknowledged the scan.
    Subscribed,
    Item(ItemChange),
    /// A record in the range has no usable location.
    Malformed(GeoRangeError),
    /// The scan failed; the subscription is over.
    Failed(GeoRangeError),
}

/// Message sent from a subscription task to the coordinator.
#[derive(Debug)]
pub(crate) struct RangeNotification {
    pub subscription: SubscriptionId,
    pub range: GeoHashRange,
    pub kind: NotificationKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Subscribing,
    Active,
    Cancelling,
}

struct RangeJob {
    id: SubscriptionId,
    state: JobState,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Result of replacing the range set.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct RangeDiff {
    pub cancelled: Vec<GeoHashRange>,
    /// Subscriptions of the cancelled ranges. Their tasks have exited, so
    /// anything they sent is already queued.
    pub retired: Vec<SubscriptionId>,
    pub started: Vec<GeoHashRange>,
}

pub(crate) struct RangeSubscriptionManager<S> {
    store: Arc<S>,
    jobs: FxHashMap<GeoHashRange, RangeJob>,
    next_id: u64,
    tx: mpsc::UnboundedSender<RangeNotification>,
    stats: Arc<QueryStats>,
}

impl<S: OrderedStore> RangeSubscriptionManager<S> {
    pub fn new(
        store: Arc<S>,
        tx: mpsc::UnboundedSender<RangeNotification>,
        stats: Arc<QueryStats>,
    ) -> Self {
        Self {
            store,
            jobs: FxHashMap::default(),
            next_id: 0,
            tx,
            stats,
        }
    }

    /// Replaces the subscribed range set with `ranges`.
    ///
    /// Ranges in both sets keep their subscription. Removed ranges are
    /// cancelled and their tasks joined before any new range is started, so
    /// once this returns no removed subscription can send again.
    pub async fn update(&mut self, ranges: &[GeoHashRange]) -> RangeDiff {
        let removed: Vec<GeoHashRange> = self
            .jobs
            .keys()
            .filter(|range| !ranges.contains(range))
            .cloned()
            .collect();

        let mut diff = RangeDiff::default();
        for (range, id) in self.cancel(removed).await {
            diff.cancelled.push(range);
            diff.retired.push(id);
        }

        for range in ranges {
            if !self.jobs.contains_key(range) {
                self.start(range.clone());
                diff.started.push(range.clone());
            }
        }

        diff.cancelled.sort_unstable();
        diff.retired.sort_unstable();
        diff
    }

    fn start(&mut self, range: GeoHashRange) {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        log::debug!("Subscribing to range {} as {}", range, id);

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_subscription(
            Arc::clone(&self.store),
            id,
            range.clone(),
            token.clone(),
            self.tx.clone(),
        ));

        self.jobs.insert(
            range,
            RangeJob {
                id,
                state: JobState::Subscribing,
                token,
                handle,
            },
        );
        self.stats.record_started();
    }

    /// Signals every job in `ranges`, then joins them one by one and drops
    /// them from the table.
    async fn cancel(&mut self, ranges: Vec<GeoHashRange>) -> Vec<(GeoHashRange, SubscriptionId)> {
        for range in &ranges {
            if let Some(job) = self.jobs.get_mut(range) {
                log::debug!("Cancelling subscription {} of range {}", job.id, range);
                job.state = JobState::Cancelling;
                job.token.cancel();
            }
        }

        let mut cancelled = Vec::with_capacity(ranges.len());
        for range in ranges {
            let Some(job) = self.jobs.remove(&range) else {
                continue;
            };
            if let Err(e) = job.handle.await {
                log::warn!("Subscription {} of range {} did not shut down cleanly: {}", job.id, range, e);
            }
            self.stats.record_cancelled();
            cancelled.push((range, job.id));
        }
        cancelled
    }

    /// True while `id` belongs to a range in the current set.
    pub fn is_current(&self, id: SubscriptionId) -> bool {
        self.jobs
            .values()
            .any(|job| job.id == id && job.state != JobState::Cancelling)
    }

    /// Marks the subscription as acknowledged by the store.
    pub fn mark_active(&mut self, id: SubscriptionId) {
        if let Some(job) = self
            .jobs
            .values_mut()
            .find(|job| job.id == id && job.state == JobState::Subscribing)
        {
            job.state = JobState::Active;
        }
    }

    /// True once every subscription was acknowledged.
    pub fn is_settled(&self) -> bool {
        self.jobs.values().all(|job| job.state == JobState::Active)
    }

    /// The current subscription whose range contains `geohash`.
    pub fn subscription_for(&self, geohash: &str) -> Option<SubscriptionId> {
        self.jobs
            .iter()
            .find(|(range, _)| range.contains(geohash))
            .map(|(_, job)| job.id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Cancels and joins every subscription.
    pub async fn shutdown(&mut self) {
        let ranges: Vec<GeoHashRange> = self.jobs.keys().cloned().collect();
        self.cancel(ranges).await;
    }
}

async fn run_subscription<S: OrderedStore>(
    store: Arc<S>,
    id: SubscriptionId,
    range: GeoHashRange,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<RangeNotification>,
) {
    let send = |kind: NotificationKind| {
        tx.send(RangeNotification {
            subscription: id,
            range: range.clone(),
            kind,
        })
        .is_ok()
    };

    let scan = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        scan = store.scan_range(SORT_FIELD, &range) => scan,
    };

    let mut items = match scan {
        Ok(items) => items,
        Err(e) => {
            send(NotificationKind::Failed(e));
            return;
        }
    };

    if !send(NotificationKind::Subscribed) {
        return;
    }

    loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            item = items.next() => Some(item),
        };

        let Some(item) = item else {
            // Changes the store already delivered still belong to this range.
            while let Some(Some(Ok(event))) = items.next().now_or_never() {
                if !send(decode(event)) {
                    break;
                }
            }
            break;
        };

        let kind = match item {
            Some(Ok(event)) => decode(event),
            Some(Err(e)) => {
                send(NotificationKind::Failed(e));
                break;
            }
            None => {
                send(NotificationKind::Failed(GeoRangeError::Store(format!(
                    "scan of range {range} ended"
                ))));
                break;
            }
        };

        if !send(kind) {
            break;
        }
    }
}

fn decode(event: StoreEvent) -> NotificationKind {
    let change = match event {
        StoreEvent::Removed { key, .. } => Ok(ItemChange::Removed { key }),
        StoreEvent::Added { key, payload } => LocationRecord::decode_location(&key, &payload)
            .map(|location| ItemChange::Added { key, location }),
        StoreEvent::Changed { key, payload } => LocationRecord::decode_location(&key, &payload)
            .map(|location| ItemChange::Changed { key, location }),
    };

    match change {
        Ok(change) => NotificationKind::Item(change),
        Err(e) => NotificationKind::Malformed(e),
    }
}
