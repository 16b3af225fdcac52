//! Query configuration: proximity threshold, coordinate scale and timezone.

use chrono_tz::Tz;

use crate::error::ConfigError;

pub const THRESHOLD_KM_VAR: &str = "NEXT_BUSES_THRESHOLD_KM";
pub const DEGREES_PER_KM_VAR: &str = "NEXT_BUSES_DEGREES_PER_KM";
pub const TIMEZONE_VAR: &str = "NEXT_BUSES_TIMEZONE";

/// Tunable parameters for a sightings query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
    /// Maximum distance from the query point for a stop to count as close.
    pub threshold_km: f64,

    /// Degrees of latitude/longitude per kilometer used by the planar
    /// distance approximation. `0.009` is roughly 111 km per degree.
    pub degrees_per_km: f64,

    /// Zone in which service days start at midnight.
    pub timezone: Tz,
}

impl QueryConfig {
    /// Create a validated configuration.
    pub fn new(threshold_km: f64, degrees_per_km: f64, timezone: Tz) -> Result<Self, ConfigError> {
        let config = Self {
            threshold_km,
            degrees_per_km,
            timezone,
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by any `NEXT_BUSES_*` variables present in the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(THRESHOLD_KM_VAR) {
            config.threshold_km = parse_float(THRESHOLD_KM_VAR, &value)?;
        }
        if let Some(value) = lookup(DEGREES_PER_KM_VAR) {
            config.degrees_per_km = parse_float(DEGREES_PER_KM_VAR, &value)?;
        }
        if let Some(value) = lookup(TIMEZONE_VAR) {
            config.timezone = parse_timezone(&value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Replace the threshold, keeping the other settings.
    pub fn with_threshold_km(mut self, threshold_km: f64) -> Result<Self, ConfigError> {
        self.threshold_km = threshold_km;
        self.validate()?;
        Ok(self)
    }

    /// Replace the timezone, keeping the other settings.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_km.is_finite() || self.threshold_km < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "threshold_km",
                value: self.threshold_km,
            });
        }
        if !self.degrees_per_km.is_finite() || self.degrees_per_km <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "degrees_per_km",
                value: self.degrees_per_km,
            });
        }
        Ok(())
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            threshold_km: 0.3,
            degrees_per_km: 0.009,
            timezone: chrono_tz::Europe::Paris,
        }
    }
}

/// Parses an IANA zone name such as `Europe/Paris`.
pub fn parse_timezone(value: &str) -> Result<Tz, ConfigError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::UnknownTimezone(value.to_string()))
}

fn parse_float(name: &'static str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn default_config() {
        let config = QueryConfig::default();

        assert_eq!(config.threshold_km, 0.3);
        assert_eq!(config.degrees_per_km, 0.009);
        assert_eq!(config.timezone, chrono_tz::Europe::Paris);
    }

    #[test]
    fn lookup_without_overrides_is_default() {
        let config = QueryConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, QueryConfig::default());
    }

    #[test]
    fn lookup_overrides() {
        let config = QueryConfig::from_lookup(lookup_from(&[
            (THRESHOLD_KM_VAR, "0.5"),
            (DEGREES_PER_KM_VAR, " 0.01 "),
            (TIMEZONE_VAR, "America/New_York"),
        ]))
        .unwrap();

        assert_eq!(config.threshold_km, 0.5);
        assert_eq!(config.degrees_per_km, 0.01);
        assert_eq!(config.timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn lookup_rejects_bad_values() {
        let err = QueryConfig::from_lookup(lookup_from(&[(THRESHOLD_KM_VAR, "far")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { name: THRESHOLD_KM_VAR, .. }));

        let err = QueryConfig::from_lookup(lookup_from(&[(TIMEZONE_VAR, "Mars/Olympus")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTimezone(_)));

        let err = QueryConfig::from_lookup(lookup_from(&[(DEGREES_PER_KM_VAR, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "degrees_per_km", .. }));
    }

    #[test]
    fn zero_threshold_is_allowed() {
        let config = QueryConfig::default().with_threshold_km(0.0).unwrap();
        assert_eq!(config.threshold_km, 0.0);
    }

    #[test]
    fn negative_or_nan_threshold_is_rejected() {
        assert!(QueryConfig::default().with_threshold_km(-1.0).is_err());
        assert!(QueryConfig::default().with_threshold_km(f64::NAN).is_err());
        assert!(QueryConfig::new(0.3, f64::INFINITY, chrono_tz::UTC).is_err());
    }
}
