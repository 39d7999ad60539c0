//! In-memory ordered store with live range scans.

use super::{ItemStream, OrderedStore, StoreEvent};
use crate::compute::GeoHashRange;
use crate::error::{GeoRangeError, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// In-memory [`OrderedStore`] backed by a `BTreeMap`.
///
/// Every open scan registers a watcher; writes are matched against all
/// watchers and delivered to them before `set` or `remove` returns. Clones
/// share the same data.
///
/// ```rust
/// use georange::store::{MemoryStore, OrderedStore};
///
/// # tokio::runtime::Builder::new_current_thread().build()?.block_on(async {
/// let store = MemoryStore::new();
/// store.set("a", r#"{"g":"9q8","l":[37.7,-122.4]}"#.into()).await?;
/// assert_eq!(store.len(), 1);
/// # Ok::<(), georange::GeoRangeError>(())
/// # })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, Bytes>,
    watchers: Vec<Watcher>,
}

struct Watcher {
    field: String,
    range: GeoHashRange,
    tx: mpsc::UnboundedSender<Result<StoreEvent>>,
}

impl Watcher {
    fn matches(&self, payload: &[u8]) -> bool {
        sort_value(payload, &self.field).is_some_and(|value| self.range.contains(&value))
    }

    /// Returns false once the scan's stream was dropped.
    fn send(&self, event: StoreEvent) -> bool {
        self.tx.send(Ok(event)).is_ok()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    /// Number of scans whose stream is still alive.
    pub fn live_scans(&self) -> usize {
        self.inner
            .lock()
            .watchers
            .iter()
            .filter(|w| !w.tx.is_closed())
            .count()
    }

    /// Fails every open scan with a [`GeoRangeError::Store`] error and
    /// closes it. Records are kept and new scans can be opened afterwards.
    pub fn disconnect(&self, reason: &str) {
        let watchers = std::mem::take(&mut self.inner.lock().watchers);
        log::debug!("Disconnecting {} scans: {}", watchers.len(), reason);
        for watcher in watchers {
            let _ = watcher.tx.send(Err(GeoRangeError::Store(reason.to_string())));
        }
    }
}

impl OrderedStore for MemoryStore {
    async fn scan_range(&self, field: &str, range: &GeoHashRange) -> Result<ItemStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = Watcher {
            field: field.to_string(),
            range: range.clone(),
            tx,
        };

        let mut inner = self.inner.lock();

        let mut initial: Vec<(String, &String, &Bytes)> = inner
            .records
            .iter()
            .filter_map(|(key, payload)| {
                let value = sort_value(payload, field)?;
                range.contains(&value).then_some((value, key, payload))
            })
            .collect();
        initial.sort();

        for (_, key, payload) in initial {
            watcher.send(StoreEvent::Added {
                key: key.clone(),
                payload: payload.clone(),
            });
        }

        inner.watchers.push(watcher);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.inner.lock().records.get(key).cloned())
    }

    async fn set(&self, key: &str, payload: Bytes) -> Result<()> {
        let mut inner = self.inner.lock();
        let old = inner.records.insert(key.to_string(), payload.clone());
        if old.as_ref() == Some(&payload) {
            return Ok(());
        }

        inner.watchers.retain(|watcher| {
            let was_inside = old.as_deref().is_some_and(|old| watcher.matches(old));
            let event = match (was_inside, watcher.matches(&payload)) {
                (false, true) => StoreEvent::Added {
                    key: key.to_string(),
                    payload: payload.clone(),
                },
                (true, true) => StoreEvent::Changed {
                    key: key.to_string(),
                    payload: payload.clone(),
                },
                (true, false) => StoreEvent::Removed {
                    key: key.to_string(),
                    payload: old.clone().unwrap_or_default(),
                },
                (false, false) => return !watcher.tx.is_closed(),
            };
            watcher.send(event)
        });

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        let Some(old) = inner.records.remove(key) else {
            return Ok(());
        };

        inner.watchers.retain(|watcher| {
            if !watcher.matches(&old) {
                return !watcher.tx.is_closed();
            }
            watcher.send(StoreEvent::Removed {
                key: key.to_string(),
                payload: old.clone(),
            })
        });

        Ok(())
    }
}

/// String value of `field` in a JSON object payload.
fn sort_value(payload: &[u8], field: &str) -> Option<String> {
    match serde_json::from_slice::<serde_json::Value>(payload).ok()? {
        serde_json::Value::Object(mut object) => match object.remove(field)? {
            serde_json::Value::String(value) => Some(value),
            _ => None,
        },
        _ => None,
    }
}
