//! Compute layer: geohash encoding and range planning.
//!
//! This module is independent of the store and of the async query machinery.
//! It provides:
//! - The base-32 geohash codec
//! - Character-aligned geohash ranges and their merging
//! - Planning the covering range set for a circle
//! - Input validation shared by the public API

pub mod base32;
pub mod geohash;
pub mod planner;
pub mod range;
pub mod validation;

pub use geohash::{GeoHash, HashBounds, Precision};
pub use planner::{circle_ranges, circle_ranges_at, query_bits};
pub use range::GeoHashRange;
