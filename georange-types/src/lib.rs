//! # georange-types
//!
//! Validated coordinate types used by the georange proximity index.
//!
//! - **Coordinates**: [`Latitude`] (saturates at the poles) and [`Longitude`]
//!   (wraps around the antimeridian)
//! - **Distances**: [`Distance`] in meters or kilometers, ordered by length
//! - **Shapes**: [`Location`] and [`Circle`]
//!
//! All types are serializable with Serde and convert to and from the `geo`
//! crate's `Point<f64>`.
//!
//! ## Examples
//!
//! ```rust
//! use georange_types::{Circle, Distance, Location};
//!
//! let sf = Location::new(37.7749, -122.4194).unwrap();
//! let nyc = Location::new(40.7128, -74.0060).unwrap();
//!
//! let circle = Circle::new(sf, Distance::kilometers(5000.0));
//! assert!(circle.contains(&nyc));
//! ```

pub mod constants;
pub mod coordinate;
pub mod distance;
pub mod location;

pub use coordinate::{CoordinateError, Latitude, Longitude};
pub use distance::Distance;
pub use location::{Circle, Location};
