//! Locations and circles on the earth's surface.

use crate::constants::EARTH_MEAN_RADIUS;
use crate::coordinate::{CoordinateError, Latitude, Longitude};
use crate::distance::Distance;
use geo::{Distance as _, HaversineMeasure};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated latitude/longitude pair.
///
/// Note the argument order of [`Location::new`] is latitude first, unlike
/// `geo::Point::new(x, y)` which takes longitude first.
///
/// # Examples
///
/// ```
/// use georange_types::Location;
///
/// let sf = Location::new(37.7749, -122.4194).unwrap();
/// let nyc = Location::new(40.7128, -74.0060).unwrap();
/// assert_eq!(sf.distance_to(&nyc).in_meters().floor(), 4_127_138.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Latitude,
    pub longitude: Longitude,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        Ok(Self {
            latitude: Latitude::new(latitude)?,
            longitude: Longitude::new(longitude)?,
        })
    }

    #[inline]
    pub const fn from_parts(latitude: Latitude, longitude: Longitude) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[inline]
    pub const fn lat(&self) -> f64 {
        self.latitude.value()
    }

    #[inline]
    pub const fn lng(&self) -> f64 {
        self.longitude.value()
    }

    /// Great-circle (haversine) distance on a sphere of the earth's mean
    /// radius.
    pub fn distance_to(&self, other: &Location) -> Distance {
        let meters = HaversineMeasure::new(EARTH_MEAN_RADIUS)
            .distance(geo::Point::from(*self), geo::Point::from(*other));
        Distance::meters(meters)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

impl From<Location> for geo::Point<f64> {
    fn from(location: Location) -> Self {
        geo::Point::new(location.lng(), location.lat())
    }
}

impl TryFrom<geo::Point<f64>> for Location {
    type Error = CoordinateError;

    fn try_from(point: geo::Point<f64>) -> Result<Self, Self::Error> {
        Location::new(point.y(), point.x())
    }
}

/// A circle on the earth's surface: a center and a radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Location,
    pub radius: Distance,
}

impl Circle {
    #[inline]
    pub const fn new(center: Location, radius: Distance) -> Self {
        Self { center, radius }
    }

    pub const fn with_center(self, center: Location) -> Self {
        Self { center, ..self }
    }

    pub const fn with_radius(self, radius: Distance) -> Self {
        Self { radius, ..self }
    }

    /// True when `location` is strictly closer to the center than the radius.
    pub fn contains(&self, location: &Location) -> bool {
        self.center.distance_to(location) < self.radius
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circle(center={}, radius={})", self.center, self.radius)
    }
}
