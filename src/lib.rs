//! Upcoming transit departures near a point, resolved from a static GTFS feed.
//!
//! Answers "which buses pass near me, and when, today?" by combining three
//! steps over a loaded [`feed::Feed`]:
//!
//! 1. [`proximity::select_close_stops`] picks the stops near the query point.
//! 2. [`calendar::active_services_on`] resolves which services run on the date.
//! 3. [`sightings::assemble_sightings`] joins stop times against both and
//!    returns them in time order.
//!
//! [`query::next_buses`] runs the three in sequence.

pub mod calendar;
pub mod config;
pub mod error;
pub mod feed;
pub mod output;
pub mod proximity;
pub mod query;
pub mod sightings;
pub mod time;

pub use config::QueryConfig;
pub use error::{ConfigError, FeedError, ResolveError};
pub use feed::Feed;
pub use query::{next_buses, next_buses_today};
pub use sightings::Sighting;
