//! End-to-end sightings query over a loaded feed.

use std::path::Path;

use chrono::NaiveDate;
use tracing::info;

use crate::calendar::active_services_on;
use crate::config::QueryConfig;
use crate::error::ResolveError;
use crate::feed::Feed;
use crate::proximity::select_close_stops;
use crate::sightings::{ScheduleTables, Sighting, assemble_sightings};
use crate::time::today_in;

/// Sightings expected on `date` at stops near (`lat`, `lon`), earliest first.
///
/// An empty list means nothing runs nearby that day; corrupt feed data is
/// reported as an error instead.
#[tracing::instrument(skip(feed, config), fields(timezone = %config.timezone))]
pub fn next_buses(
    feed: &Feed,
    lat: f64,
    lon: f64,
    date: NaiveDate,
    config: &QueryConfig,
) -> Result<Vec<Sighting>, ResolveError> {
    let close_stops = select_close_stops(&feed.stops, lat, lon, config);
    let active_services = active_services_on(&feed.calendars, &feed.calendar_dates, date)?;

    let tables = ScheduleTables {
        stops: &feed.stops,
        stop_times: &feed.stop_times,
        trips: &feed.trips,
        routes: &feed.routes,
    };
    let sightings = assemble_sightings(tables, &close_stops, &active_services, date, config.timezone)?;

    info!(
        close_stops = close_stops.len(),
        active_services = active_services.len(),
        sightings = sightings.len(),
        "Query resolved"
    );
    Ok(sightings)
}

/// Loads the feed in `dir` and runs [`next_buses`] for today in the
/// configured timezone.
pub fn next_buses_today(
    dir: impl AsRef<Path>,
    lat: f64,
    lon: f64,
    config: &QueryConfig,
) -> Result<Vec<Sighting>, ResolveError> {
    let feed = Feed::load(dir)?;
    next_buses(&feed, lat, lon, today_in(config.timezone), config)
}
