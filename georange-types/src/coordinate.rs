//! Latitude and longitude newtypes.
//!
//! Both wrap an `f64` in degrees and are validated on construction. Offsetting
//! a [`Latitude`] saturates at the poles, offsetting a [`Longitude`] wraps
//! around the antimeridian.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Error returned when a coordinate is outside its valid range.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("Latitude must be between -90 and 90, was: {0}")]
    Latitude(f64),
    #[error("Longitude must be between -180 and 180, was: {0}")]
    Longitude(f64),
}

/// Latitude in degrees, always within `[-90, 90]`.
///
/// # Examples
///
/// ```
/// use georange_types::Latitude;
///
/// let lat = Latitude::new(89.0).unwrap();
/// assert_eq!((lat + 5.0).value(), 90.0);
/// assert!(Latitude::new(91.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Latitude(f64);

impl Latitude {
    pub const MIN: f64 = -90.0;
    pub const MAX: f64 = 90.0;

    pub fn new(value: f64) -> Result<Self, CoordinateError> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoordinateError::Latitude(value))
        }
    }

    /// Clamps `value` into range instead of rejecting it. NaN maps to 0.
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    fn saturating_offset(self, degrees: f64) -> Self {
        let moved = self.0 + degrees;
        if moved.is_nan() {
            return self;
        }
        Self(moved.clamp(Self::MIN, Self::MAX))
    }
}

impl Add<f64> for Latitude {
    type Output = Latitude;

    fn add(self, degrees: f64) -> Latitude {
        self.saturating_offset(degrees)
    }
}

impl Sub<f64> for Latitude {
    type Output = Latitude;

    fn sub(self, degrees: f64) -> Latitude {
        self.saturating_offset(-degrees)
    }
}

impl TryFrom<f64> for Latitude {
    type Error = CoordinateError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Latitude> for f64 {
    fn from(latitude: Latitude) -> Self {
        latitude.0
    }
}

impl fmt::Display for Latitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Longitude in degrees, always within `[-180, 180]`.
///
/// # Examples
///
/// ```
/// use georange_types::Longitude;
///
/// let lng = Longitude::new(170.0).unwrap();
/// assert_eq!((lng + 20.0).value(), -170.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Longitude(f64);

impl Longitude {
    pub const MIN: f64 = -180.0;
    pub const MAX: f64 = 180.0;

    pub fn new(value: f64) -> Result<Self, CoordinateError> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoordinateError::Longitude(value))
        }
    }

    /// Wraps `value` into range instead of rejecting it. Non-finite values
    /// map to 0.
    pub fn wrapping(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0.0);
        }
        Self(wrap_longitude(value))
    }

    #[inline]
    pub const fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    fn wrapping_offset(self, degrees: f64) -> Self {
        let moved = self.0 + degrees;
        if !moved.is_finite() {
            return self;
        }
        Self(wrap_longitude(moved))
    }
}

/// Folds any finite longitude back into `[-180, 180]` modulo 360.
fn wrap_longitude(value: f64) -> f64 {
    if (Longitude::MIN..=Longitude::MAX).contains(&value) {
        return value;
    }
    let adjusted = value + 180.0;
    if adjusted > 0.0 {
        (adjusted % 360.0) - 180.0
    } else {
        180.0 - (-adjusted % 360.0)
    }
}

impl Add<f64> for Longitude {
    type Output = Longitude;

    fn add(self, degrees: f64) -> Longitude {
        self.wrapping_offset(degrees)
    }
}

impl Sub<f64> for Longitude {
    type Output = Longitude;

    fn sub(self, degrees: f64) -> Longitude {
        self.wrapping_offset(-degrees)
    }
}

impl TryFrom<f64> for Longitude {
    type Error = CoordinateError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Longitude> for f64 {
    fn from(longitude: Longitude) -> Self {
        longitude.0
    }
}

impl fmt::Display for Longitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latitude_bounds() {
        assert!(Latitude::new(-90.0).is_ok());
        assert!(Latitude::new(90.0).is_ok());
        assert_eq!(
            Latitude::new(90.5),
            Err(CoordinateError::Latitude(90.5))
        );
        assert!(Latitude::new(f64::NAN).is_err());
    }

    #[test]
    fn test_latitude_saturates_at_poles() {
        let lat = Latitude::new(80.0).unwrap();
        assert_eq!((lat + 15.0).value(), 90.0);
        assert_eq!((lat - 200.0).value(), -90.0);
        assert_eq!((lat - 10.0).value(), 70.0);
    }

    #[test]
    fn test_longitude_bounds() {
        assert!(Longitude::new(-180.0).is_ok());
        assert!(Longitude::new(180.0).is_ok());
        assert!(Longitude::new(180.1).is_err());
        assert!(Longitude::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_longitude_wraps() {
        let lng = Longitude::new(170.0).unwrap();
        assert_eq!((lng + 20.0).value(), -170.0);

        let lng = Longitude::new(-170.0).unwrap();
        assert_eq!((lng - 20.0).value(), 170.0);

        let lng = Longitude::new(0.0).unwrap();
        assert_eq!((lng + 180.0).value(), 180.0);
        assert_eq!((lng + 720.0 + 45.0).value(), 45.0);
    }

    #[test]
    fn test_lenient_constructors() {
        assert_eq!(Latitude::saturating(120.0).value(), 90.0);
        assert_eq!(Latitude::saturating(f64::NAN).value(), 0.0);
        assert_eq!(Longitude::wrapping(190.0).value(), -170.0);
        assert_eq!(Longitude::wrapping(-45.0).value(), -45.0);
    }

    #[test]
    fn test_non_finite_offset_is_ignored() {
        let lng = Longitude::new(10.0).unwrap();
        assert_eq!((lng + f64::NAN).value(), 10.0);

        let lat = Latitude::new(10.0).unwrap();
        assert_eq!((lat + f64::INFINITY).value(), 90.0);
    }

    #[test]
    fn test_serde_validates() {
        let lat: Latitude = serde_json::from_str("45.5").unwrap();
        assert_eq!(lat.value(), 45.5);
        assert!(serde_json::from_str::<Latitude>("120.0").is_err());
    }
}
