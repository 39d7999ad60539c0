//! The geo index: point operations and live circle queries over an
//! [`OrderedStore`].

use crate::builder::GeoIndexBuilder;
use crate::compute::validation::validate_key;
use crate::config::Config;
use crate::error::Result;
use crate::query::GeoQuery;
use crate::store::{LocationRecord, OrderedStore};
use georange_types::{Circle, Distance, Location};
use std::sync::Arc;

/// Geo index over an ordered store.
///
/// Locations are stored as [`LocationRecord`] payloads whose sort field is
/// the geohash of the location. Queries scan geohash ranges of that field.
///
/// ```rust
/// use georange::{GeoIndex, Location};
/// use georange::store::MemoryStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), georange::GeoRangeError> {
/// let index = GeoIndex::new(MemoryStore::new());
/// let office = Location::new(37.7749, -122.4194)?;
///
/// index.set_location("office", office).await?;
/// assert_eq!(index.get_location("office").await?, Some(office));
///
/// index.remove_location("office").await?;
/// assert_eq!(index.get_location("office").await?, None);
/// # Ok(())
/// # }
/// ```
pub struct GeoIndex<S> {
    store: Arc<S>,
    config: Config,
}

impl<S> std::fmt::Debug for GeoIndex<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoIndex")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> Clone for GeoIndex<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: OrderedStore> GeoIndex<S> {
    /// Index with the default configuration.
    pub fn new(store: S) -> Self {
        Self::from_parts(Arc::new(store), Config::default())
    }

    /// Create an index builder for advanced configuration.
    pub fn builder() -> GeoIndexBuilder {
        GeoIndexBuilder::new()
    }

    /// `config` must already be validated.
    pub(crate) fn from_parts(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stores `location` under `key`, replacing any previous location.
    pub async fn set_location(&self, key: &str, location: Location) -> Result<()> {
        validate_key(key)?;
        let record = LocationRecord::new(location, self.config.stored_precision());
        self.store.set(key, record.to_bytes()?).await
    }

    /// The location stored under `key`.
    ///
    /// A stored payload without a usable location is an
    /// [`InvalidFormat`](crate::GeoRangeError::InvalidFormat) error.
    pub async fn get_location(&self, key: &str) -> Result<Option<Location>> {
        validate_key(key)?;
        match self.store.get(key).await? {
            Some(payload) => LocationRecord::decode_location(key, &payload).map(Some),
            None => Ok(None),
        }
    }

    pub async fn remove_location(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.store.remove(key).await
    }

    /// Starts a live query for keys inside `circle`.
    ///
    /// The radius is capped at the configured maximum. Must be called within
    /// a Tokio runtime.
    pub fn query(&self, circle: Circle) -> Result<GeoQuery> {
        GeoQuery::spawn(
            Arc::clone(&self.store),
            circle,
            self.config.stored_precision(),
            self.config.max_radius(),
        )
    }

    pub fn query_at(&self, center: Location, radius: Distance) -> Result<GeoQuery> {
        self.query(Circle::new(center, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoRangeError;
    use crate::store::MemoryStore;
    use bytes::Bytes;

    fn loc(lat: f64, lng: f64) -> Location {
        Location::new(lat, lng).unwrap()
    }

    #[tokio::test]
    async fn test_set_writes_record_shape() {
        let index = GeoIndex::new(MemoryStore::new());
        index.set_location("sf", loc(37.7749, -122.4194)).await.unwrap();

        let payload = index.store().get("sf").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["g"], "9q8yyk8ytp");
        assert_eq!(value["l"], serde_json::json!([37.7749, -122.4194]));
    }

    #[tokio::test]
    async fn test_precision_from_config() {
        let index = GeoIndex::<MemoryStore>::builder()
            .precision(5)
            .build(MemoryStore::new())
            .unwrap();
        index.set_location("nyc", loc(40.7128, -74.0060)).await.unwrap();

        let payload = index.store().get("nyc").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(value["g"], "dr5re");
    }

    #[tokio::test]
    async fn test_get_missing_and_malformed() {
        let index = GeoIndex::new(MemoryStore::new());
        assert_eq!(index.get_location("nobody").await.unwrap(), None);

        index
            .store()
            .set("broken", Bytes::from_static(br#"{"g":"9q8"}"#))
            .await
            .unwrap();
        let err = index.get_location("broken").await.unwrap_err();
        assert!(matches!(err, GeoRangeError::InvalidFormat { ref key, .. } if key == "broken"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_arguments() {
        let index = GeoIndex::new(MemoryStore::new());
        assert!(index.set_location("", loc(0.0, 0.0)).await.unwrap_err().is_invalid_argument());
        assert!(index.get_location("").await.unwrap_err().is_invalid_argument());
        assert!(index.remove_location("").await.unwrap_err().is_invalid_argument());

        let err = index
            .query_at(loc(0.0, 0.0), Distance::meters(-5.0))
            .err()
            .unwrap();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_query_caps_radius() {
        let index = GeoIndex::<MemoryStore>::builder()
            .max_radius(Distance::kilometers(50.0))
            .build(MemoryStore::new())
            .unwrap();
        let query = index
            .query_at(loc(0.0, 0.0), Distance::kilometers(500.0))
            .unwrap();
        assert_eq!(query.radius(), Distance::kilometers(50.0));

        query.set_radius(Distance::kilometers(5.0)).unwrap();
        assert_eq!(query.radius(), Distance::kilometers(5.0));
        query.cancel().await.unwrap();
    }
}
