//! Error types.
//!
//! [`FeedError`] covers decoding a GTFS directory. [`ResolveError`] covers a
//! sightings query and wraps load failures unchanged, so callers can tell a
//! feed that could not be read apart from one that was read but is corrupt.

use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;

use crate::time::TimeError;

/// Failures while loading a feed from disk.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// A required file could not be opened or read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row did not decode into the expected columns
    #[error("malformed row in {file}: {source}")]
    Csv {
        file: &'static str,
        #[source]
        source: csv::Error,
    },

    /// An identifier appears twice in a table that requires unique ids
    #[error("duplicate {table} id '{id}'")]
    DuplicateId { table: &'static str, id: String },

    /// A column holds a value outside its allowed set
    #[error("invalid {column} '{value}' in {file}")]
    InvalidValue {
        file: &'static str,
        column: &'static str,
        value: String,
    },
}

/// Failures while resolving a sightings query.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The feed could not be loaded
    #[error("feed load failed: {0}")]
    FeedLoad(#[from] FeedError),

    /// A stop time points at a trip missing from trips.txt
    #[error("stop time at stop '{stop_id}' references unknown trip '{trip_id}'")]
    UnknownTrip { trip_id: String, stop_id: String },

    /// A stop time points at a stop missing from stops.txt
    #[error("trip '{trip_id}' stops at unknown stop '{stop_id}'")]
    UnknownStop { stop_id: String, trip_id: String },

    /// A trip points at a route missing from routes.txt
    #[error("trip '{trip_id}' references unknown route '{route_id}'")]
    UnknownRoute { route_id: String, trip_id: String },

    /// A calendar or calendar exception carries an unparseable date
    #[error("service '{service_id}' has malformed {field}: {source}")]
    MalformedDate {
        service_id: String,
        field: &'static str,
        #[source]
        source: TimeError,
    },

    /// A stop time carries an unparseable departure time
    #[error("trip '{trip_id}' has malformed departure time: {source}")]
    MalformedTime {
        trip_id: String,
        #[source]
        source: TimeError,
    },

    /// Local midnight does not exist for the query date
    #[error("no local midnight on {date} in {timezone}")]
    InvalidServiceDay { date: NaiveDate, timezone: Tz },
}

impl ResolveError {
    /// True when the feed was read but its contents are inconsistent.
    pub fn is_integrity_violation(&self) -> bool {
        !matches!(
            self,
            ResolveError::FeedLoad(_) | ResolveError::InvalidServiceDay { .. }
        )
    }
}

/// Invalid query configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a number, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} is out of range: {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}
