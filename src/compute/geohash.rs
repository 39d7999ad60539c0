//! Geohash encoding and decoding.
//!
//! A geohash interleaves binary subdivisions of longitude (even bit indices)
//! and latitude (odd bit indices) and packs them five bits per base-32
//! symbol. A coordinate strictly above the midpoint of its current interval
//! yields a `1` bit; a coordinate on or below it yields a `0` bit.
//!
//! ```rust
//! use georange::compute::{GeoHash, Precision};
//! use georange::Location;
//!
//! let sf = Location::new(37.7749, -122.4194)?;
//! let hash = GeoHash::encode(&sf, Precision::DEFAULT);
//! assert_eq!(hash.as_str(), "9q8yyk8ytp");
//!
//! let approx = hash.decode();
//! assert!((approx.lat() - sf.lat()).abs() < 0.01);
//! # Ok::<(), georange::GeoRangeError>(())
//! ```

use super::base32::{self, BASE32_CHARS, BITS_PER_CHAR};
use crate::error::{GeoRangeError, Result};
use georange_types::{Latitude, Location, Longitude};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PRECISION: usize = 10;
pub const MAX_PRECISION: usize = 22;
pub const MAX_PRECISION_BITS: u32 = MAX_PRECISION as u32 * BITS_PER_CHAR;

/// Number of base-32 symbols in a geohash, between 1 and 22.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Precision(u8);

impl Precision {
    pub const DEFAULT: Precision = Precision(DEFAULT_PRECISION as u8);
    pub const MAX: Precision = Precision(MAX_PRECISION as u8);

    pub fn new(chars: usize) -> Result<Self> {
        if (1..=MAX_PRECISION).contains(&chars) {
            Ok(Self(chars as u8))
        } else {
            Err(GeoRangeError::InvalidPrecision(chars))
        }
    }

    /// Smallest precision holding `bits` bits, clamped to the valid range.
    pub fn for_bits(bits: u32) -> Self {
        let chars = bits.div_ceil(BITS_PER_CHAR).clamp(1, MAX_PRECISION as u32);
        Self(chars as u8)
    }

    #[inline]
    pub const fn chars(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0 as u32 * BITS_PER_CHAR
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for Precision {
    type Error = GeoRangeError;

    fn try_from(chars: usize) -> Result<Self> {
        Self::new(chars)
    }
}

impl From<Precision> for usize {
    fn from(precision: Precision) -> Self {
        precision.chars()
    }
}

/// The cell a geohash denotes, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl HashBounds {
    const WORLD: HashBounds = HashBounds {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lng: -180.0,
        max_lng: 180.0,
    };

    pub fn center(&self) -> Location {
        Location::from_parts(
            Latitude::saturating((self.min_lat + self.max_lat) / 2.0),
            Longitude::wrapping((self.min_lng + self.max_lng) / 2.0),
        )
    }

    /// Largest latitude error of the cell center, in degrees.
    pub fn lat_error(&self) -> f64 {
        (self.max_lat - self.min_lat) / 2.0
    }

    /// Largest longitude error of the cell center, in degrees.
    pub fn lng_error(&self) -> f64 {
        (self.max_lng - self.min_lng) / 2.0
    }

    pub fn contains(&self, location: &Location) -> bool {
        (self.min_lat..=self.max_lat).contains(&location.lat())
            && (self.min_lng..=self.max_lng).contains(&location.lng())
    }
}

/// A validated geohash string.
///
/// Ordering is plain string ordering, which is the order the backing store
/// sorts its index field by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeoHash(String);

impl GeoHash {
    /// Validates `value` against the geohash alphabet and length limits.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() || value.len() > MAX_PRECISION || !base32::is_valid(&value) {
            return Err(GeoRangeError::InvalidGeohash(value));
        }
        Ok(Self(value))
    }

    /// Encodes `location` with `precision` symbols.
    pub fn encode(location: &Location, precision: Precision) -> Self {
        let (lat, lng) = (location.lat(), location.lng());
        let mut lat_range = [Latitude::MIN, Latitude::MAX];
        let mut lng_range = [Longitude::MIN, Longitude::MAX];
        let mut hash = String::with_capacity(precision.chars());
        let mut bit = 0u32;

        for _ in 0..precision.chars() {
            let mut value = 0u8;
            for _ in 0..BITS_PER_CHAR {
                let (coordinate, range) = if bit % 2 == 0 {
                    (lng, &mut lng_range)
                } else {
                    (lat, &mut lat_range)
                };
                let mid = (range[0] + range[1]) / 2.0;
                value <<= 1;
                if coordinate > mid {
                    value |= 1;
                    range[0] = mid;
                } else {
                    range[1] = mid;
                }
                bit += 1;
            }
            hash.push(BASE32_CHARS[usize::from(value)] as char);
        }

        Self(hash)
    }

    /// The cell this hash denotes.
    pub fn bounds(&self) -> HashBounds {
        let mut bounds = HashBounds::WORLD;
        let mut bit = 0u32;

        for symbol in self.0.bytes() {
            // The alphabet was checked on construction.
            let value = base32::value_of(symbol).unwrap_or_default();
            for shift in (0..BITS_PER_CHAR).rev() {
                let set = (value >> shift) & 1 == 1;
                if bit % 2 == 0 {
                    let mid = (bounds.min_lng + bounds.max_lng) / 2.0;
                    if set {
                        bounds.min_lng = mid;
                    } else {
                        bounds.max_lng = mid;
                    }
                } else {
                    let mid = (bounds.min_lat + bounds.max_lat) / 2.0;
                    if set {
                        bounds.min_lat = mid;
                    } else {
                        bounds.max_lat = mid;
                    }
                }
                bit += 1;
            }
        }

        bounds
    }

    /// Approximate location: the center of the hash's cell.
    pub fn decode(&self) -> Location {
        self.bounds().center()
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn precision(&self) -> Precision {
        Precision(self.0.len() as u8)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for GeoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GeoHash {
    type Err = GeoRangeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for GeoHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GeoHash {
    type Error = GeoRangeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<GeoHash> for String {
    fn from(hash: GeoHash) -> Self {
        hash.0
    }
}
