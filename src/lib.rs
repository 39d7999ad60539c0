//! Live geohash proximity queries over ordered key-value stores.
//!
//! Locations are written as records whose sort field holds the geohash of the
//! location. A query for a circle is planned as a small set of geohash ranges,
//! each range is kept open as a live scan of the store, and the results are
//! filtered by exact distance into one stream of enter, move and exit events.
//!
//! ```rust
//! use futures::StreamExt;
//! use georange::{Distance, GeoIndex, Location, QueryEvent};
//! use georange::store::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> georange::Result<()> {
//! let index = GeoIndex::new(MemoryStore::new());
//! index.set_location("bus-12", Location::new(37.7790, -122.4180)?).await?;
//!
//! let mut query = index.query_at(Location::new(37.7749, -122.4194)?, Distance::kilometers(1.0))?;
//! let mut events = query.events().unwrap();
//!
//! let event = events.next().await.unwrap()?;
//! assert_eq!(event.key(), "bus-12");
//! assert!(matches!(event, QueryEvent::Entered { .. }));
//! assert!(query.snapshot().contains_key("bus-12"));
//!
//! query.cancel().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod compute;
pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod store;

pub use builder::GeoIndexBuilder;
pub use config::Config;
pub use error::{GeoRangeError, Result};
pub use index::GeoIndex;

pub use compute::{GeoHash, GeoHashRange, Precision, circle_ranges};

pub use query::{GeoQuery, QueryEvent, QuerySnapshot, QueryStats};

pub use store::{MemoryStore, OrderedStore};

pub use georange_types::{Circle, CoordinateError, Distance, Latitude, Location, Longitude};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeoIndex, GeoIndexBuilder, GeoRangeError, Result};

    pub use crate::{Circle, Distance, Location};

    pub use crate::{GeoQuery, QueryEvent, QuerySnapshot};

    pub use crate::{Config, MemoryStore, OrderedStore};
}
