//! Configuration for a geo index.

use crate::compute::Precision;
use crate::compute::geohash::{DEFAULT_PRECISION, MAX_PRECISION};
use georange_types::Distance;
use georange_types::constants::MAX_SUPPORTED_RADIUS_KM;
use serde::de::Error;
use serde::{Deserialize, Serialize};

/// Index configuration.
///
/// # Examples
///
/// ```rust
/// use georange::Config;
///
/// let config = Config::default().with_precision(8).with_max_radius_km(500.0);
/// assert!(config.validate().is_ok());
///
/// // Load from JSON
/// let json = r#"{ "precision": 12 }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.precision, 12);
/// assert_eq!(config.max_radius_km, 8587.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Geohash symbols stored in each record's sort field (1-22, default: 10)
    #[serde(default = "Config::default_precision")]
    pub precision: usize,

    /// Largest radius a query may use, in kilometers. Larger radii are
    /// silently capped.
    #[serde(default = "Config::default_max_radius_km")]
    pub max_radius_km: f64,
}

impl Config {
    const fn default_precision() -> usize {
        DEFAULT_PRECISION
    }

    const fn default_max_radius_km() -> f64 {
        MAX_SUPPORTED_RADIUS_KM
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_max_radius_km(mut self, max_radius_km: f64) -> Self {
        self.max_radius_km = max_radius_km;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_PRECISION).contains(&self.precision) {
            return Err(format!(
                "Precision must be between 1 and {}, got: {}",
                MAX_PRECISION, self.precision
            ));
        }

        if !self.max_radius_km.is_finite() {
            return Err("Max radius must be finite (not NaN or infinity)".to_string());
        }

        if self.max_radius_km <= 0.0 {
            return Err("Max radius must be positive".to_string());
        }

        if self.max_radius_km > MAX_SUPPORTED_RADIUS_KM {
            return Err(format!(
                "Max radius must not exceed {} km, got: {}",
                MAX_SUPPORTED_RADIUS_KM, self.max_radius_km
            ));
        }

        Ok(())
    }

    /// Stored precision. Falls back to the default when out of range.
    pub(crate) fn stored_precision(&self) -> Precision {
        Precision::new(self.precision).unwrap_or_default()
    }

    pub(crate) fn max_radius(&self) -> Distance {
        Distance::kilometers(self.max_radius_km)
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(serde_json::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as TOML string (requires toml feature)
    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            precision: Self::default_precision(),
            max_radius_km: Self::default_max_radius_km(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.precision, 10);
        assert_eq!(config.max_radius_km, 8587.0);
        assert!(config.validate().is_ok());
        assert_eq!(config.stored_precision(), Precision::DEFAULT);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().with_precision(0).validate().is_err());
        assert!(Config::default().with_precision(23).validate().is_err());
        assert!(Config::default().with_precision(22).validate().is_ok());
        assert!(Config::default().with_max_radius_km(0.0).validate().is_err());
        assert!(Config::default().with_max_radius_km(f64::NAN).validate().is_err());
        assert!(Config::default().with_max_radius_km(9000.0).validate().is_err());
        assert!(Config::default().with_max_radius_km(0.5).validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default().with_precision(7).with_max_radius_km(100.0);
        let json = config.to_json().unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_from_json_rejects_invalid() {
        assert!(Config::from_json(r#"{ "precision": 30 }"#).is_err());
        assert!(Config::from_json(r#"{ "max_radius_km": -1.0 }"#).is_err());
        assert!(Config::from_json(r#"{ "sync_policy": "always" }"#).is_err());
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_config_toml() {
        let config = Config::from_toml("precision = 9\nmax_radius_km = 25.0\n").unwrap();
        assert_eq!(config.precision, 9);
        assert_eq!(config.max_radius_km, 25.0);
        assert_eq!(Config::from_toml(&config.to_toml().unwrap()).unwrap(), config);
        assert!(Config::from_toml("precision = 0").is_err());
    }
}
