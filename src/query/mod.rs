//! Live circle queries.
//!
//! A [`GeoQuery`] keeps the set of keys inside a circle up to date while the
//! circle and the stored data change. Each query runs one coordinator task
//! plus one task per subscribed geohash range:
//!
//! ```text
//! circle (watch) ─▶ coordinator ─▶ range planner ─▶ subscription manager
//!                        ▲                                 │ one task per range
//!                        └──────── notifications ◀─────────┘
//!                        │
//!                        ├─▶ events (Entered / Moved / Exited)
//!                        └─▶ states (key → location snapshots)
//! ```

mod coordinator;
mod reconciler;
mod subscription;

pub use subscription::SubscriptionId;

use crate::compute::Precision;
use crate::compute::validation::validate_radius;
use crate::error::{GeoRangeError, Result};
use crate::store::OrderedStore;
use coordinator::Coordinator;
use georange_types::{Circle, Distance, Location};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;

/// Keys currently inside a query's circle, sorted by key.
pub type QuerySnapshot = BTreeMap<String, Location>;

/// Stream of query events. An `Err` item is the last one.
pub type QueryEvents = UnboundedReceiverStream<Result<QueryEvent>>;

/// Stream of published states. Yields the current state first, then every
/// change.
pub type QueryStates = WatchStream<QuerySnapshot>;

/// A change in the set of keys inside a query's circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    Entered { key: String, location: Location },
    Exited { key: String },
    Moved { key: String, location: Location },
}

impl QueryEvent {
    pub fn key(&self) -> &str {
        match self {
            Self::Entered { key, .. } | Self::Exited { key } | Self::Moved { key, .. } => key,
        }
    }
}

/// Counters of a running query, updated by its coordinator.
#[derive(Debug, Default)]
pub struct QueryStats {
    notifications_applied: AtomicU64,
    malformed_skipped: AtomicU64,
    stale_dropped: AtomicU64,
    subscriptions_started: AtomicU64,
    subscriptions_cancelled: AtomicU64,
    circle_updates: AtomicU64,
}

impl QueryStats {
    /// Record changes applied to the published state.
    pub fn notifications_applied(&self) -> u64 {
        self.notifications_applied.load(Ordering::Relaxed)
    }

    /// Records skipped because their payload had no usable location.
    pub fn malformed_skipped(&self) -> u64 {
        self.malformed_skipped.load(Ordering::Relaxed)
    }

    /// Notifications from subscriptions that were already cancelled.
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped.load(Ordering::Relaxed)
    }

    pub fn subscriptions_started(&self) -> u64 {
        self.subscriptions_started.load(Ordering::Relaxed)
    }

    pub fn subscriptions_cancelled(&self) -> u64 {
        self.subscriptions_cancelled.load(Ordering::Relaxed)
    }

    /// Circles applied, including the initial one.
    pub fn circle_updates(&self) -> u64 {
        self.circle_updates.load(Ordering::Relaxed)
    }

    pub(crate) fn record_applied(&self) {
        self.notifications_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_malformed(&self) {
        self.malformed_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stale(&self) {
        self.stale_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_started(&self) {
        self.subscriptions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.subscriptions_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_circle_update(&self) {
        self.circle_updates.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle to a live circle query.
///
/// The circle can be moved and resized at any time; each update replaces the
/// whole circle at once. Results are available as discrete [`QueryEvent`]s
/// through [`events`](Self::events), as full snapshots through
/// [`states`](Self::states), or on demand through
/// [`snapshot`](Self::snapshot).
///
/// Dropping the handle stops the query. Use [`cancel`](Self::cancel) to stop
/// it and wait until every range subscription has shut down.
///
/// # Examples
///
/// ```rust
/// use futures::StreamExt;
/// use georange::{Distance, GeoIndex, Location, QueryEvent};
/// use georange::store::MemoryStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), georange::GeoRangeError> {
/// let index = GeoIndex::new(MemoryStore::new());
/// let mut query = index.query_at(Location::new(0.0, 0.0)?, Distance::kilometers(10.0))?;
/// let mut events = query.events().unwrap();
///
/// index.set_location("a", Location::new(0.0, 0.0)?).await?;
/// let event = events.next().await.unwrap()?;
/// assert!(matches!(event, QueryEvent::Entered { ref key, .. } if key == "a"));
///
/// query.set_radius(Distance::meters(0.0))?;
/// let event = events.next().await.unwrap()?;
/// assert_eq!(event, QueryEvent::Exited { key: "a".into() });
///
/// query.cancel().await
/// # }
/// ```
pub struct GeoQuery {
    circle: watch::Sender<Circle>,
    max_radius: Distance,
    events: Option<mpsc::UnboundedReceiver<Result<QueryEvent>>>,
    states: watch::Receiver<QuerySnapshot>,
    stats: Arc<QueryStats>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl GeoQuery {
    /// Starts the coordinator for `circle`. Must be called within a Tokio
    /// runtime.
    pub(crate) fn spawn<S: OrderedStore>(
        store: Arc<S>,
        circle: Circle,
        precision: Precision,
        max_radius: Distance,
    ) -> Result<Self> {
        validate_radius(circle.radius)?;
        let circle = cap_radius(circle, max_radius);

        let (circle_tx, circle_rx) = watch::channel(circle);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(QuerySnapshot::new());
        let stats = Arc::new(QueryStats::default());
        let token = CancellationToken::new();

        let coordinator = Coordinator::new(
            store,
            precision,
            circle_rx,
            events_tx,
            state_tx,
            Arc::clone(&stats),
            token.clone(),
        );
        let task = tokio::spawn(coordinator.run());

        Ok(Self {
            circle: circle_tx,
            max_radius,
            events: Some(events_rx),
            states: state_rx,
            stats,
            token,
            task: Some(task),
        })
    }

    /// The circle as last set, with its radius capped.
    pub fn circle(&self) -> Circle {
        *self.circle.borrow()
    }

    pub fn center(&self) -> Location {
        self.circle().center
    }

    pub fn radius(&self) -> Distance {
        self.circle().radius
    }

    pub fn set_center(&self, center: Location) -> Result<()> {
        self.update(|circle| circle.with_center(center))
    }

    /// Radii above the index's maximum are silently capped.
    pub fn set_radius(&self, radius: Distance) -> Result<()> {
        validate_radius(radius)?;
        self.update(|circle| circle.with_radius(radius))
    }

    pub fn set_circle(&self, circle: Circle) -> Result<()> {
        validate_radius(circle.radius)?;
        self.update(|_| circle)
    }

    fn update(&self, change: impl FnOnce(Circle) -> Circle) -> Result<()> {
        if self.circle.is_closed() {
            return Err(GeoRangeError::QueryClosed);
        }
        let max_radius = self.max_radius;
        self.circle.send_if_modified(|circle| {
            let next = cap_radius(change(*circle), max_radius);
            if next == *circle {
                false
            } else {
                *circle = next;
                true
            }
        });
        Ok(())
    }

    /// Takes the event stream. Returns `None` after the first call.
    ///
    /// Events are buffered from the moment the query starts, so nothing is
    /// lost between starting the query and taking the stream.
    pub fn events(&mut self) -> Option<QueryEvents> {
        self.events.take().map(UnboundedReceiverStream::new)
    }

    /// Stream of published states, deduplicated. The stream ends when the
    /// query stops.
    pub fn states(&self) -> QueryStates {
        WatchStream::new(self.states.clone())
    }

    /// The keys currently inside the circle.
    pub fn snapshot(&self) -> QuerySnapshot {
        self.states.borrow().clone()
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    /// True once the query stopped, whether cancelled or after a store
    /// failure.
    pub fn is_closed(&self) -> bool {
        self.circle.is_closed()
    }

    /// Stops the query and waits for every range subscription to shut down.
    pub async fn cancel(mut self) -> Result<()> {
        self.token.cancel();
        match self.task.take() {
            Some(task) => task.await.map_err(|e| {
                log::warn!("Query task failed: {}", e);
                GeoRangeError::QueryClosed
            }),
            None => Ok(()),
        }
    }
}

impl Drop for GeoQuery {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn cap_radius(circle: Circle, max_radius: Distance) -> Circle {
    circle.with_radius(circle.radius.min(max_radius))
}
