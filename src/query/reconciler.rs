//! Merges per-range changes into one published key set.
//!
//! The reconciler keeps two tables. `tracked` holds the latest location of
//! every key reported by a current subscription, along with the subscription
//! that reported it. `published` is the subset of tracked keys inside the
//! exact circle. Every mutation re-evaluates the affected keys and emits the
//! difference between their old and new published entries.

use super::QueryEvent;
use super::subscription::{ItemChange, SubscriptionId};
use crate::compute::{GeoHash, Precision};
use georange_types::{Circle, Location};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

struct Tracked {
    location: Location,
    geohash: GeoHash,
    owner: SubscriptionId,
}

pub(crate) struct Reconciler {
    circle: Circle,
    precision: Precision,
    tracked: FxHashMap<String, Tracked>,
    published: BTreeMap<String, Location>,
}

impl Reconciler {
    /// `precision` must match the precision of the stored sort field.
    pub fn new(circle: Circle, precision: Precision) -> Self {
        Self {
            circle,
            precision,
            tracked: FxHashMap::default(),
            published: BTreeMap::new(),
        }
    }

    pub fn published(&self) -> &BTreeMap<String, Location> {
        &self.published
    }

    /// Applies one change reported by `subscription`.
    ///
    /// Added and Changed are treated alike: the reporter becomes the key's
    /// owner. A removal from a subscription that does not own the key is
    /// ignored, since the key was already reported by another range.
    pub fn apply(&mut self, subscription: SubscriptionId, change: ItemChange, events: &mut Vec<QueryEvent>) {
        let key = match change {
            ItemChange::Added { key, location } | ItemChange::Changed { key, location } => {
                let geohash = GeoHash::encode(&location, self.precision);
                self.tracked.insert(
                    key.clone(),
                    Tracked {
                        location,
                        geohash,
                        owner: subscription,
                    },
                );
                key
            }
            ItemChange::Removed { key } => {
                match self.tracked.get(&key) {
                    Some(tracked) if tracked.owner == subscription => {
                        self.tracked.remove(&key);
                    }
                    Some(tracked) => {
                        log::debug!(
                            "Ignoring removal of {:?} by {}, owned by {}",
                            key,
                            subscription,
                            tracked.owner
                        );
                        return;
                    }
                    None => return,
                }
                key
            }
        };

        self.publish(&key, events);
    }

    /// Replaces the circle and re-evaluates every tracked key against it.
    pub fn set_circle(&mut self, circle: Circle, events: &mut Vec<QueryEvent>) {
        if circle == self.circle {
            return;
        }
        self.circle = circle;

        let keys: BTreeSet<String> = self
            .tracked
            .keys()
            .chain(self.published.keys())
            .cloned()
            .collect();
        for key in keys {
            self.publish(&key, events);
        }
    }

    /// Hands keys of subscriptions that are no longer current to the
    /// current subscription covering their geohash. Keys no current range
    /// covers are forgotten.
    pub fn rehome<C, F>(&mut self, is_current: C, subscription_for: F, events: &mut Vec<QueryEvent>)
    where
        C: Fn(SubscriptionId) -> bool,
        F: Fn(&str) -> Option<SubscriptionId>,
    {
        let mut orphans = Vec::new();
        for (key, tracked) in self.tracked.iter_mut() {
            if is_current(tracked.owner) {
                continue;
            }
            match subscription_for(tracked.geohash.as_str()) {
                Some(owner) => tracked.owner = owner,
                None => orphans.push(key.clone()),
            }
        }

        orphans.sort_unstable();
        for key in orphans {
            self.tracked.remove(&key);
            self.publish(&key, events);
        }
    }

    /// Brings the published entry of `key` in line with its tracked entry.
    fn publish(&mut self, key: &str, events: &mut Vec<QueryEvent>) {
        let wanted = self
            .tracked
            .get(key)
            .map(|tracked| tracked.location)
            .filter(|location| self.circle.contains(location));

        match (wanted, self.published.get(key).copied()) {
            (Some(location), None) => {
                self.published.insert(key.to_string(), location);
                events.push(QueryEvent::Entered {
                    key: key.to_string(),
                    location,
                });
            }
            (Some(location), Some(previous)) if location != previous => {
                self.published.insert(key.to_string(), location);
                events.push(QueryEvent::Moved {
                    key: key.to_string(),
                    location,
                });
            }
            (None, Some(_)) => {
                self.published.remove(key);
                events.push(QueryEvent::Exited {
                    key: key.to_string(),
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use georange_types::Distance;

    const R1: SubscriptionId = SubscriptionId::from_raw(1);
    const R2: SubscriptionId = SubscriptionId::from_raw(2);

    fn loc(lat: f64, lng: f64) -> Location {
        Location::new(lat, lng).unwrap()
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Circle::new(loc(0.0, 0.0), Distance::kilometers(10.0)),
            Precision::DEFAULT,
        )
    }

    fn added(key: &str, location: Location) -> ItemChange {
        ItemChange::Added {
            key: key.into(),
            location,
        }
    }

    fn changed(key: &str, location: Location) -> ItemChange {
        ItemChange::Changed {
            key: key.into(),
            location,
        }
    }

    fn removed(key: &str) -> ItemChange {
        ItemChange::Removed { key: key.into() }
    }

    fn apply(r: &mut Reconciler, id: SubscriptionId, change: ItemChange) -> Vec<QueryEvent> {
        let mut events = Vec::new();
        r.apply(id, change, &mut events);
        events
    }

    #[test]
    fn test_enter_move_exit() {
        let mut r = reconciler();

        let events = apply(&mut r, R1, added("a", loc(0.0, 0.0)));
        assert_eq!(
            events,
            vec![QueryEvent::Entered {
                key: "a".into(),
                location: loc(0.0, 0.0)
            }]
        );

        assert!(apply(&mut r, R1, changed("a", loc(0.0, 0.0))).is_empty());
        assert!(apply(&mut r, R1, added("a", loc(0.0, 0.0))).is_empty());

        let events = apply(&mut r, R1, changed("a", loc(0.01, 0.0)));
        assert_eq!(
            events,
            vec![QueryEvent::Moved {
                key: "a".into(),
                location: loc(0.01, 0.0)
            }]
        );

        let events = apply(&mut r, R1, removed("a"));
        assert_eq!(events, vec![QueryEvent::Exited { key: "a".into() }]);
        assert!(r.published().is_empty());
    }

    #[test]
    fn test_changed_for_unknown_key_enters() {
        let mut r = reconciler();
        let events = apply(&mut r, R1, changed("a", loc(0.02, 0.02)));
        assert!(matches!(events.as_slice(), [QueryEvent::Entered { .. }]));
    }

    #[test]
    fn test_outside_circle_is_never_published() {
        let mut r = reconciler();
        assert!(apply(&mut r, R1, added("far", loc(0.2, 0.0))).is_empty());
        assert!(apply(&mut r, R1, removed("far")).is_empty());
        assert!(apply(&mut r, R1, removed("never-seen")).is_empty());
    }

    #[test]
    fn test_moving_across_the_boundary() {
        let mut r = reconciler();
        apply(&mut r, R1, added("a", loc(0.0, 0.0)));

        let events = apply(&mut r, R1, changed("a", loc(0.2, 0.0)));
        assert_eq!(events, vec![QueryEvent::Exited { key: "a".into() }]);

        let events = apply(&mut r, R1, changed("a", loc(0.05, 0.0)));
        assert!(matches!(events.as_slice(), [QueryEvent::Entered { .. }]));
    }

    #[test]
    fn test_circle_change_alone_emits_events() {
        let mut r = reconciler();
        apply(&mut r, R1, added("a", loc(0.0, 0.0)));
        apply(&mut r, R1, added("b", loc(0.0, 0.08)));
        assert_eq!(r.published().len(), 2);

        let mut events = Vec::new();
        r.set_circle(Circle::new(loc(0.0, 0.0), Distance::kilometers(1.0)), &mut events);
        assert_eq!(events, vec![QueryEvent::Exited { key: "b".into() }]);

        events.clear();
        r.set_circle(Circle::new(loc(0.0, 0.08), Distance::kilometers(1.0)), &mut events);
        assert_eq!(
            events,
            vec![
                QueryEvent::Exited { key: "a".into() },
                QueryEvent::Entered {
                    key: "b".into(),
                    location: loc(0.0, 0.08)
                },
            ]
        );
    }

    #[test]
    fn test_removal_from_previous_owner_is_ignored() {
        let mut r = reconciler();
        apply(&mut r, R1, added("a", loc(0.0, 0.0)));

        // "a" moved into R2's range; R2 reports first, then R1 drops it.
        let events = apply(&mut r, R2, added("a", loc(0.0, 0.01)));
        assert!(matches!(events.as_slice(), [QueryEvent::Moved { .. }]));
        assert!(apply(&mut r, R1, removed("a")).is_empty());
        assert_eq!(r.published().get("a"), Some(&loc(0.0, 0.01)));

        let events = apply(&mut r, R2, removed("a"));
        assert_eq!(events, vec![QueryEvent::Exited { key: "a".into() }]);
    }

    #[test]
    fn test_rehome_keeps_covered_keys() {
        let mut r = reconciler();
        apply(&mut r, R1, added("a", loc(0.0, 0.0)));
        apply(&mut r, R1, added("b", loc(0.01, 0.01)));

        let a_hash = GeoHash::encode(&loc(0.0, 0.0), Precision::DEFAULT);
        let mut events = Vec::new();
        r.rehome(
            |id| id == R2,
            |hash| (hash == a_hash.as_str()).then_some(R2),
            &mut events,
        );
        assert_eq!(events, vec![QueryEvent::Exited { key: "b".into() }]);

        // "a" is now owned by R2, so R2 may remove it.
        let events = apply(&mut r, R2, removed("a"));
        assert_eq!(events, vec![QueryEvent::Exited { key: "a".into() }]);
    }
}
