//! Index builder for flexible configuration
//!
//! This module provides a builder pattern for creating a [`GeoIndex`] over
//! any [`OrderedStore`] with a validated [`Config`].

use crate::config::Config;
use crate::error::{GeoRangeError, Result};
use crate::index::GeoIndex;
use crate::store::OrderedStore;
use georange_types::Distance;
use std::sync::Arc;

/// Builder for index configuration.
///
/// ```rust
/// use georange::{Distance, GeoIndexBuilder};
/// use georange::store::MemoryStore;
///
/// let index = GeoIndexBuilder::new()
///     .precision(12)
///     .max_radius(Distance::kilometers(250.0))
///     .build(MemoryStore::new())?;
/// assert_eq!(index.config().precision, 12);
/// # Ok::<(), georange::GeoRangeError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeoIndexBuilder {
    config: Config,
}

impl GeoIndexBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Geohash symbols written to each record's sort field.
    pub fn precision(mut self, precision: usize) -> Self {
        self.config = self.config.with_precision(precision);
        self
    }

    /// Largest radius a query may use.
    pub fn max_radius(mut self, radius: Distance) -> Self {
        self.config = self.config.with_max_radius_km(radius.in_kilometers());
        self
    }

    /// Build the index. Fails when the configuration is invalid.
    pub fn build<S: OrderedStore>(self, store: S) -> Result<GeoIndex<S>> {
        self.build_shared(Arc::new(store))
    }

    /// Build the index over a store shared with other owners.
    pub fn build_shared<S: OrderedStore>(self, store: Arc<S>) -> Result<GeoIndex<S>> {
        self.config.validate().map_err(GeoRangeError::InvalidInput)?;
        Ok(GeoIndex::from_parts(store, self.config))
    }
}
