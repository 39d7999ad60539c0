//! Distances with a unit tag.

use crate::constants::{
    EARTH_E2, EARTH_EQ_RADIUS, EPSILON, METERS_PER_DEGREE_LATITUDE, METERS_PER_KILOMETER,
};
use crate::coordinate::Latitude;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A length in meters or kilometers.
///
/// Equality and ordering always compare the length in meters, so
/// `Distance::kilometers(1.0) == Distance::meters(1000.0)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    Meters(f64),
    Kilometers(f64),
}

impl Distance {
    #[inline]
    pub const fn meters(value: f64) -> Self {
        Self::Meters(value)
    }

    #[inline]
    pub const fn kilometers(value: f64) -> Self {
        Self::Kilometers(value)
    }

    /// Length in meters.
    pub fn in_meters(self) -> f64 {
        match self {
            Self::Meters(value) => value,
            Self::Kilometers(value) => value * METERS_PER_KILOMETER,
        }
    }

    /// Length in kilometers.
    pub fn in_kilometers(self) -> f64 {
        match self {
            Self::Meters(value) => value / METERS_PER_KILOMETER,
            Self::Kilometers(value) => value,
        }
    }

    /// Returns the shorter of the two distances, keeping its unit.
    pub fn min(self, other: Distance) -> Distance {
        if other < self { other } else { self }
    }

    /// Degrees of latitude spanned by this distance.
    pub fn to_latitude_degrees(self) -> f64 {
        self.in_meters() / METERS_PER_DEGREE_LATITUDE
    }

    /// Degrees of longitude spanned by this distance at `latitude`.
    ///
    /// A degree of longitude shrinks towards the poles, so the same distance
    /// covers more degrees there. The result is capped at 360.
    pub fn to_longitude_degrees(self, latitude: Latitude) -> f64 {
        let radians = latitude.to_radians();
        let numerator = radians.cos() * EARTH_EQ_RADIUS * std::f64::consts::PI / 180.0;
        let denominator = 1.0 / (1.0 - EARTH_E2 * radians.sin() * radians.sin()).sqrt();
        let meters_per_degree = numerator * denominator;
        let meters = self.in_meters();
        let degrees = if meters_per_degree < EPSILON {
            meters
        } else {
            meters / meters_per_degree
        };
        degrees.min(360.0)
    }
}

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.in_meters() == other.in_meters()
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.in_meters().partial_cmp(&other.in_meters())
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meters(value) => write!(f, "{value} m"),
            Self::Kilometers(value) => write!(f, "{value} km"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert_eq!(Distance::kilometers(2.5).in_meters(), 2500.0);
        assert_eq!(Distance::meters(750.0).in_kilometers(), 0.75);
    }

    #[test]
    fn test_comparison_normalizes_units() {
        assert_eq!(Distance::kilometers(1.0), Distance::meters(1000.0));
        assert!(Distance::meters(999.0) < Distance::kilometers(1.0));
        assert!(Distance::kilometers(8587.0) > Distance::meters(10.0));
    }

    #[test]
    fn test_min_keeps_unit() {
        let capped = Distance::kilometers(9000.0).min(Distance::kilometers(8587.0));
        assert!(matches!(capped, Distance::Kilometers(v) if v == 8587.0));

        let small = Distance::meters(10.0).min(Distance::kilometers(8587.0));
        assert!(matches!(small, Distance::Meters(v) if v == 10.0));
    }

    #[test]
    fn test_latitude_degrees() {
        let degrees = Distance::meters(METERS_PER_DEGREE_LATITUDE).to_latitude_degrees();
        assert!((degrees - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_longitude_degrees_grow_towards_poles() {
        let distance = Distance::kilometers(10.0);
        let equator = distance.to_longitude_degrees(Latitude::new(0.0).unwrap());
        let north = distance.to_longitude_degrees(Latitude::new(60.0).unwrap());
        assert!(equator > 0.08 && equator < 0.1);
        assert!(north > equator * 1.9);
    }

    #[test]
    fn test_longitude_degrees_capped() {
        let distance = Distance::kilometers(5000.0);
        let pole = distance.to_longitude_degrees(Latitude::new(90.0).unwrap());
        assert_eq!(pole, 360.0);
    }
}
