//! Validation for arguments of the public API.

use crate::error::{GeoRangeError, Result};
use georange_types::Distance;

/// Validates a record key.
///
/// Keys must be non-empty and free of control characters.
///
/// # Examples
///
/// ```
/// use georange::compute::validation::validate_key;
///
/// assert!(validate_key("truck-42").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("bad\nkey").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(GeoRangeError::InvalidInput(
            "Key must not be empty".to_string(),
        ));
    }

    if key.chars().any(char::is_control) {
        return Err(GeoRangeError::InvalidInput(format!(
            "Key must not contain control characters: {:?}",
            key
        )));
    }

    Ok(())
}

/// Validates a query radius is finite and not negative.
///
/// A zero radius is accepted; its circle contains nothing.
pub fn validate_radius(radius: Distance) -> Result<()> {
    let meters = radius.in_meters();

    if !meters.is_finite() {
        return Err(GeoRangeError::InvalidInput(format!(
            "Radius must be finite, got: {}",
            radius
        )));
    }

    if meters < 0.0 {
        return Err(GeoRangeError::InvalidInput(format!(
            "Radius must not be negative, got: {}",
            radius
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_keys() {
        assert!(validate_key("a").is_ok());
        assert!(validate_key("user:1234").is_ok());
        assert!(validate_key("bus stop ünter den linden").is_ok());
    }

    #[test]
    fn test_invalid_keys() {
        for key in ["", "\t", "a\u{0}b"] {
            let err = validate_key(key).unwrap_err();
            assert!(err.is_invalid_argument(), "{key:?}");
        }
    }

    #[test]
    fn test_valid_radius() {
        assert!(validate_radius(Distance::meters(0.0)).is_ok());
        assert!(validate_radius(Distance::kilometers(10.0)).is_ok());
        assert!(validate_radius(Distance::kilometers(100_000.0)).is_ok());
    }

    #[test]
    fn test_invalid_radius() {
        assert!(validate_radius(Distance::meters(-1.0)).is_err());
        assert!(validate_radius(Distance::kilometers(f64::NAN)).is_err());
        assert!(validate_radius(Distance::meters(f64::INFINITY)).is_err());
    }
}
