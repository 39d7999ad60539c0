//! The task that owns a live query.
//!
//! One coordinator per query serializes everything that touches the range
//! set and the published state: circle updates, subscription notifications
//! and shutdown. Subscription tasks never touch either table directly.

use super::reconciler::Reconciler;
use super::subscription::{
    NotificationKind, RangeNotification, RangeSubscriptionManager, SubscriptionId,
};
use super::{QueryEvent, QuerySnapshot, QueryStats};
use crate::compute::{Precision, circle_ranges_at};
use crate::error::{GeoRangeError, Result};
use crate::store::OrderedStore;
use georange_types::Circle;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

pub(crate) struct Coordinator<S> {
    manager: RangeSubscriptionManager<S>,
    reconciler: Reconciler,
    precision: Precision,
    notifications: mpsc::UnboundedReceiver<RangeNotification>,
    circle: watch::Receiver<Circle>,
    events: mpsc::UnboundedSender<Result<QueryEvent>>,
    state: watch::Sender<QuerySnapshot>,
    stats: Arc<QueryStats>,
    token: CancellationToken,
}

impl<S: OrderedStore> Coordinator<S> {
    pub fn new(
        store: Arc<S>,
        precision: Precision,
        circle: watch::Receiver<Circle>,
        events: mpsc::UnboundedSender<Result<QueryEvent>>,
        state: watch::Sender<QuerySnapshot>,
        stats: Arc<QueryStats>,
        token: CancellationToken,
    ) -> Self {
        let (tx, notifications) = mpsc::unbounded_channel();
        let initial = *circle.borrow();
        Self {
            manager: RangeSubscriptionManager::new(store, tx, Arc::clone(&stats)),
            reconciler: Reconciler::new(initial, precision),
            precision,
            notifications,
            circle,
            events,
            state,
            stats,
            token,
        }
    }

    /// Runs until cancelled, until the query handle is dropped, or until a
    /// range scan fails. A scan failure is delivered as the last item of the
    /// event stream.
    pub async fn run(mut self) {
        let circle = *self.circle.borrow_and_update();
        let outcome = match self.apply_circle(circle).await {
            Err(e) => Err(e),
            Ok(()) => loop {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => break Ok(()),
                    changed = self.circle.changed() => {
                        if changed.is_err() {
                            break Ok(());
                        }
                        let circle = *self.circle.borrow_and_update();
                        if let Err(e) = self.apply_circle(circle).await {
                            break Err(e);
                        }
                    }
                    Some(notification) = self.notifications.recv() => {
                        let mut events = Vec::new();
                        let handled = self.handle(notification, &[], &mut events);
                        self.emit(events);
                        if let Err(e) = handled {
                            break Err(e);
                        }
                    }
                }
            },
        };

        self.manager.shutdown().await;

        if let Err(e) = outcome {
            log::warn!("Query stopped: {}", e);
            let _ = self.events.send(Err(e));
        } else {
            log::debug!("Query cancelled");
        }
    }

    async fn apply_circle(&mut self, circle: Circle) -> Result<()> {
        let ranges = circle_ranges_at(&circle, self.precision);
        let diff = self.manager.update(&ranges).await;
        log::debug!(
            "Applied {}: {} ranges, {} started, {} cancelled",
            circle,
            ranges.len(),
            diff.started.len(),
            diff.cancelled.len()
        );

        // The retired tasks were joined, so whatever they sent is queued.
        // Apply it while their ids still own keys, then hand the keys over.
        let mut events = Vec::new();
        let mut outcome = Ok(());
        while let Ok(notification) = self.notifications.try_recv() {
            if let Err(e) = self.handle(notification, &diff.retired, &mut events) {
                outcome = Err(e);
                break;
            }
        }

        if !diff.cancelled.is_empty() {
            let manager = &self.manager;
            self.reconciler.rehome(
                |id| manager.is_current(id),
                |geohash| manager.subscription_for(geohash),
                &mut events,
            );
        }
        self.reconciler.set_circle(circle, &mut events);
        self.stats.record_circle_update();
        self.emit(events);
        outcome
    }

    /// Applies one notification. `retired` lists subscriptions cancelled by
    /// the circle update in progress; their changes still count, their
    /// failures do not.
    fn handle(
        &mut self,
        notification: RangeNotification,
        retired: &[SubscriptionId],
        events: &mut Vec<QueryEvent>,
    ) -> Result<()> {
        let RangeNotification {
            subscription,
            range,
            kind,
        } = notification;

        let current = self.manager.is_current(subscription);
        if !current && !retired.contains(&subscription) {
            log::debug!("Dropping notification from stale subscription {} of range {}", subscription, range);
            self.stats.record_stale();
            return Ok(());
        }

        match kind {
            NotificationKind::Subscribed => {
                self.manager.mark_active(subscription);
                if current && self.manager.is_settled() {
                    log::debug!("All {} ranges subscribed", self.manager.len());
                }
            }
            NotificationKind::Item(change) => {
                self.reconciler.apply(subscription, change, events);
                self.stats.record_applied();
            }
            NotificationKind::Malformed(e) => {
                log::warn!("Skipping record in range {}: {}", range, e);
                self.stats.record_malformed();
            }
            NotificationKind::Failed(e) if !current => {
                log::debug!("Ignoring failure of cancelled range {}: {}", range, e);
            }
            NotificationKind::Failed(e) => {
                log::warn!("Scan of range {} failed: {}", range, e);
                return Err(match e {
                    e @ GeoRangeError::Store(_) => e,
                    other => GeoRangeError::Store(other.to_string()),
                });
            }
        }

        Ok(())
    }

    /// Publishes the new state, then the events leading to it, so a reader
    /// of an event always finds it reflected in the snapshot.
    fn emit(&self, events: Vec<QueryEvent>) {
        if events.is_empty() {
            return;
        }

        let published = self.reconciler.published();
        self.state.send_if_modified(|state| {
            if *state == *published {
                false
            } else {
                state.clone_from(published);
                true
            }
        });

        for event in events {
            // Nobody listening is fine; the state stream still updates.
            let _ = self.events.send(Ok(event));
        }
    }
}
