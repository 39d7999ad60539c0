//! Error types for georange.

use georange_types::CoordinateError;

pub type Result<T> = std::result::Result<T, GeoRangeError>;

#[derive(Debug, thiserror::Error)]
pub enum GeoRangeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not a valid geohash: {0:?}")]
    InvalidGeohash(String),

    #[error("Precision of a geohash must be between 1 and 22, got: {0}")]
    InvalidPrecision(usize),

    /// A stored record does not carry a usable location.
    #[error("Location data for key {key:?} has invalid format: {reason}")]
    InvalidFormat { key: String, reason: String },

    #[error(transparent)]
    Coordinate(#[from] CoordinateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Query is closed")]
    QueryClosed,
}

impl GeoRangeError {
    /// True for errors caused by a malformed argument rather than by data or
    /// the store.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidGeohash(_)
                | Self::InvalidPrecision(_)
                | Self::Coordinate(_)
        )
    }

    pub(crate) fn invalid_format(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_grouping() {
        assert!(GeoRangeError::InvalidPrecision(0).is_invalid_argument());
        assert!(GeoRangeError::InvalidGeohash("a".into()).is_invalid_argument());
        assert!(GeoRangeError::from(CoordinateError::Latitude(91.0)).is_invalid_argument());
        assert!(!GeoRangeError::Store("down".into()).is_invalid_argument());
        assert!(!GeoRangeError::invalid_format("k", "missing l").is_invalid_argument());
    }

    #[test]
    fn test_messages() {
        let err = GeoRangeError::invalid_format("car-1", "missing field `l`");
        assert_eq!(
            err.to_string(),
            "Location data for key \"car-1\" has invalid format: missing field `l`"
        );
        assert_eq!(
            GeoRangeError::InvalidPrecision(23).to_string(),
            "Precision of a geohash must be between 1 and 22, got: 23"
        );
    }
}
