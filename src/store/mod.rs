//! Ordered key-value store abstraction.
//!
//! The index only needs a store that can scan a range of one sortable field
//! and keep the scan open, reporting records that enter, change within, or
//! leave the range. [`OrderedStore`] is that seam; [`MemoryStore`] is the
//! in-process implementation.

mod memory;
mod record;

pub use memory::MemoryStore;
pub use record::LocationRecord;

use crate::compute::GeoHashRange;
use crate::error::Result;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::future::Future;
use std::sync::Arc;

/// Name of the payload field holding the geohash the store sorts by.
pub const SORT_FIELD: &str = "g";

/// A change to a record inside a scanned range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The record entered the range, or was present when the scan opened.
    Added { key: String, payload: Bytes },
    /// The record changed and is still inside the range.
    Changed { key: String, payload: Bytes },
    /// The record left the range or was deleted. Carries the last payload
    /// seen inside the range.
    Removed { key: String, payload: Bytes },
}

impl StoreEvent {
    pub fn key(&self) -> &str {
        match self {
            Self::Added { key, .. } | Self::Changed { key, .. } | Self::Removed { key, .. } => key,
        }
    }

    pub fn payload(&self) -> &Bytes {
        match self {
            Self::Added { payload, .. }
            | Self::Changed { payload, .. }
            | Self::Removed { payload, .. } => payload,
        }
    }
}

/// Live stream of changes in a scanned range. An `Err` item means the scan
/// failed and no further items will follow.
pub type ItemStream = BoxStream<'static, Result<StoreEvent>>;

/// Trait for stores that can serve live range scans.
///
/// Implementations must order `scan_range` results by the string value of
/// `field`, compared byte-wise, and treat both range bounds as inclusive.
pub trait OrderedStore: Send + Sync + 'static {
    /// Opens a live scan of records whose `field` lies within `range`.
    ///
    /// The returned future resolves once the store acknowledged the scan.
    /// Records already inside the range are delivered first as
    /// [`StoreEvent::Added`], in field order. The scan stays open until the
    /// stream is dropped.
    fn scan_range(
        &self,
        field: &str,
        range: &GeoHashRange,
    ) -> impl Future<Output = Result<ItemStream>> + Send;

    /// Get the payload stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Bytes>>> + Send;

    /// Insert or replace the payload stored under `key`.
    fn set(&self, key: &str, payload: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<S: OrderedStore> OrderedStore for Arc<S> {
    fn scan_range(
        &self,
        field: &str,
        range: &GeoHashRange,
    ) -> impl Future<Output = Result<ItemStream>> + Send {
        (**self).scan_range(field, range)
    }

    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Bytes>>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, payload: Bytes) -> impl Future<Output = Result<()>> + Send {
        (**self).set(key, payload)
    }

    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).remove(key)
    }
}
