//! The stored shape of a location.

use crate::compute::{GeoHash, Precision};
use crate::error::{GeoRangeError, Result};
use bytes::Bytes;
use georange_types::Location;
use serde::{Deserialize, Serialize};

/// Payload written for every indexed key: `{"g": <geohash>, "l": [lat, lng]}`.
///
/// `g` is the field the store sorts and scans by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "g")]
    pub geohash: GeoHash,
    #[serde(rename = "l", with = "lat_lng")]
    pub location: Location,
}

/// Only the location is needed to read a record back.
#[derive(Deserialize)]
struct StoredLocation {
    #[serde(rename = "l", with = "lat_lng")]
    location: Location,
}

impl LocationRecord {
    pub fn new(location: Location, precision: Precision) -> Self {
        Self {
            geohash: GeoHash::encode(&location, precision),
            location,
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Reads the location out of a stored payload.
    ///
    /// Any payload without an `l` field holding two in-range numbers is an
    /// [`GeoRangeError::InvalidFormat`] error naming `key`. The sort field is
    /// not checked.
    pub fn decode_location(key: &str, payload: &[u8]) -> Result<Location> {
        serde_json::from_slice::<StoredLocation>(payload)
            .map(|stored| stored.location)
            .map_err(|e| GeoRangeError::invalid_format(key, e.to_string()))
    }
}

/// `Location` as a `[lat, lng]` array.
mod lat_lng {
    use georange_types::Location;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(location: &Location, serializer: S) -> Result<S::Ok, S::Error> {
        [location.lat(), location.lng()].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Location, D::Error> {
        let [lat, lng] = <[f64; 2]>::deserialize(deserializer)?;
        Location::new(lat, lng).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Result<Location> {
        LocationRecord::decode_location("k", &serde_json::to_vec(&value).unwrap())
    }

    #[test]
    fn test_payload_shape() {
        let location = Location::new(37.7749, -122.4194).unwrap();
        let record = LocationRecord::new(location, Precision::DEFAULT);
        let bytes = record.to_bytes().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, json!({"g": "9q8yyk8ytp", "l": [37.7749, -122.4194]}));

        let back: LocationRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_decode_accepts_integers_and_extra_fields() {
        let location = decode(json!({"l": [10, -20], "g": "whatever", "extra": true})).unwrap();
        assert_eq!((location.lat(), location.lng()), (10.0, -20.0));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let cases = [
            json!({"g": "9q8"}),
            json!({"l": "37,-122"}),
            json!({"l": [37.0]}),
            json!({"l": [37.0, -122.0, 3.0]}),
            json!({"l": ["37", "-122"]}),
            json!({"l": [95.0, 0.0]}),
            json!([1, 2]),
        ];
        for value in cases {
            let err = decode(value.clone()).unwrap_err();
            assert!(
                matches!(&err, GeoRangeError::InvalidFormat { key, .. } if key == "k"),
                "{value}: {err}"
            );
        }

        let err = LocationRecord::decode_location("k", b"not json").unwrap_err();
        assert!(matches!(err, GeoRangeError::InvalidFormat { .. }));
    }
}
