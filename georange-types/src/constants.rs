//! Earth model constants shared by distance and geohash range math.

/// Length of a degree of latitude at the equator, in meters.
pub const METERS_PER_DEGREE_LATITUDE: f64 = 110_574.0;

/// Meridional circumference of the earth, in meters.
pub const EARTH_MERIDIONAL_CIRCUMFERENCE: f64 = 40_007_860.0;

/// Equatorial radius of the earth, in meters.
pub const EARTH_EQ_RADIUS: f64 = 6_378_137.0;

/// Polar radius of the earth, in meters.
pub const EARTH_POLAR_RADIUS: f64 = 6_357_852.3;

/// Mean of the equatorial and polar radii; used for great-circle distances.
pub const EARTH_MEAN_RADIUS: f64 = (EARTH_EQ_RADIUS + EARTH_POLAR_RADIUS) / 2.0;

/// Squared eccentricity, `(r_e^2 - r_p^2) / r_e^2` with `r_p = 6356752.3`.
pub const EARTH_E2: f64 = 0.006_694_478_197_99;

/// Cutoff for floating point comparisons.
pub const EPSILON: f64 = 1e-12;

pub const METERS_PER_KILOMETER: f64 = 1000.0;

/// Largest query radius, in kilometers. Beyond it a bounding box needs fewer
/// than one bit of geohash and range planning degenerates.
pub const MAX_SUPPORTED_RADIUS_KM: f64 = 8_587.0;
