//! Range planning: the geohash ranges covering a circle.
//!
//! The circle's bounding box is approximated by the coarsest bit depth at
//! which one geohash cell is at least as large as the box's half extents.
//! Nine sample points (center, edges and corners of the box) are hashed at
//! that depth; the cells containing them cover every point of the box. Each
//! cell becomes a range and overlapping ranges are merged.

use super::geohash::{GeoHash, MAX_PRECISION_BITS, Precision};
use super::range::{GeoHashRange, merge_ranges};
use georange_types::constants::{EARTH_MERIDIONAL_CIRCUMFERENCE, MAX_SUPPORTED_RADIUS_KM};
use georange_types::{Circle, Distance, Latitude, Location};
use smallvec::SmallVec;

/// Number of significant geohash bits shared by the whole bounding box of
/// `circle`, between 1 and 110.
///
/// Even bits of a geohash are longitude, so the longitude depth counts one
/// bit less than twice its per-axis depth.
pub fn query_bits(circle: &Circle) -> u32 {
    let radius = capped_radius(circle.radius);
    let (north, south) = latitude_edges(circle.center.latitude, radius);

    let latitude_bits = latitude_bits(radius).floor() as i64 * 2;
    let longitude_bits = longitude_bits(radius, north)
        .floor()
        .min(longitude_bits(radius, south).floor()) as i64
        * 2
        - 1;

    latitude_bits
        .min(longitude_bits)
        .clamp(1, i64::from(MAX_PRECISION_BITS)) as u32
}

/// The merged set of ranges whose keys cover every point strictly inside
/// `circle`.
///
/// Ranges are returned sorted and no two of them overlap or touch. Radii
/// above 8587 km are planned as 8587 km.
///
/// ```rust
/// use georange::compute::circle_ranges;
/// use georange::{Circle, Distance, Location};
///
/// let sf = Location::new(37.7749, -122.4194)?;
/// let ranges = circle_ranges(&Circle::new(sf, Distance::kilometers(1.0)));
/// assert_eq!(ranges.len(), 1);
/// assert_eq!(ranges[0].start(), "9q8yy0");
/// # Ok::<(), georange::GeoRangeError>(())
/// ```
pub fn circle_ranges(circle: &Circle) -> Vec<GeoHashRange> {
    circle_ranges_at(circle, Precision::MAX)
}

/// Like [`circle_ranges`], for keys whose sort field holds `stored` symbols.
///
/// The bit depth never exceeds what `stored` symbols carry, since a range
/// bound longer than the stored hashes would sort past all of them.
pub fn circle_ranges_at(circle: &Circle, stored: Precision) -> Vec<GeoHashRange> {
    let bits = query_bits(circle).min(stored.bits());
    let precision = Precision::for_bits(bits);
    let radius = capped_radius(circle.radius);
    let center = circle.center;

    let (north, south) = latitude_edges(center.latitude, radius);
    let longitude_delta = radius
        .to_longitude_degrees(north)
        .max(radius.to_longitude_degrees(south));
    let west = center.longitude - longitude_delta;
    let east = center.longitude + longitude_delta;

    let samples: SmallVec<[GeoHashRange; 9]> = [south, center.latitude, north]
        .into_iter()
        .flat_map(|lat| {
            [west, center.longitude, east]
                .into_iter()
                .map(move |lng| Location::from_parts(lat, lng))
        })
        .map(|sample| GeoHashRange::for_bits(&GeoHash::encode(&sample, precision), bits))
        .collect();

    merge_ranges(samples)
}

fn capped_radius(radius: Distance) -> Distance {
    radius.min(Distance::kilometers(MAX_SUPPORTED_RADIUS_KM))
}

fn latitude_edges(latitude: Latitude, radius: Distance) -> (Latitude, Latitude) {
    let delta = radius.to_latitude_degrees();
    (latitude + delta, latitude - delta)
}

fn latitude_bits(radius: Distance) -> f64 {
    (EARTH_MERIDIONAL_CIRCUMFERENCE / 2.0 / radius.in_meters())
        .log2()
        .min(f64::from(MAX_PRECISION_BITS))
}

fn longitude_bits(radius: Distance, latitude: Latitude) -> f64 {
    let degrees = radius.to_longitude_degrees(latitude);
    let bits = if degrees.abs() > 0.0 {
        (360.0 / degrees).log2()
    } else {
        1.0
    };
    bits.max(1.0)
}
