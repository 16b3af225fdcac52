//! Assembly of the time-ordered sightings list.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::ResolveError;
use crate::feed::{Route, Stop, StopTime, Trip};
use crate::time::{parse_departure_offset, service_day_start};

/// An expected vehicle visit at a nearby stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub timestamp: DateTime<Tz>,
    pub route_name: String,
    pub headsign: String,
}

/// Read-only tables the assembler joins stop times against.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleTables<'a> {
    pub stops: &'a [Stop],
    pub stop_times: &'a [StopTime],
    pub trips: &'a HashMap<String, Trip>,
    pub routes: &'a HashMap<String, Route>,
}

/// Joins stop times at `close_stops` on services in `active_services` into
/// sightings for the service day `reference_day` in `timezone`.
///
/// Each matching stop time yields exactly one sighting. The result is
/// sorted by timestamp with a stable sort, so stop times sharing a
/// timestamp keep their table order.
///
/// # Errors
///
/// Every stop time is checked before filtering, so a corrupt row fails the
/// query wherever the query point is. A stop time whose trip or stop is not
/// in its table, a trip whose route is not in the route table, or a
/// departure time that does not parse aborts the whole assembly.
pub fn assemble_sightings(
    tables: ScheduleTables<'_>,
    close_stops: &HashMap<&str, &Stop>,
    active_services: &HashSet<&str>,
    reference_day: NaiveDate,
    timezone: Tz,
) -> Result<Vec<Sighting>, ResolveError> {
    let midnight = service_day_start(reference_day, timezone).ok_or(
        ResolveError::InvalidServiceDay {
            date: reference_day,
            timezone,
        },
    )?;
    let known_stops: HashSet<&str> = tables.stops.iter().map(|stop| stop.id.as_str()).collect();

    let mut sightings = Vec::new();
    for stop_time in tables.stop_times {
        let trip = tables
            .trips
            .get(&stop_time.trip_id)
            .ok_or_else(|| ResolveError::UnknownTrip {
                trip_id: stop_time.trip_id.clone(),
                stop_id: stop_time.stop_id.clone(),
            })?;
        if !known_stops.contains(stop_time.stop_id.as_str()) {
            return Err(ResolveError::UnknownStop {
                stop_id: stop_time.stop_id.clone(),
                trip_id: trip.id.clone(),
            });
        }
        let route = tables
            .routes
            .get(&trip.route_id)
            .ok_or_else(|| ResolveError::UnknownRoute {
                route_id: trip.route_id.clone(),
                trip_id: trip.id.clone(),
            })?;
        let offset =
            parse_departure_offset(&stop_time.departure).map_err(|source| ResolveError::MalformedTime {
                trip_id: trip.id.clone(),
                source,
            })?;

        if !close_stops.contains_key(stop_time.stop_id.as_str())
            || !active_services.contains(trip.service_id.as_str())
        {
            continue;
        }

        sightings.push(Sighting {
            timestamp: midnight + offset,
            route_name: route.short_name.clone(),
            headsign: trip.headsign.clone(),
        });
    }

    sightings.sort_by_key(|sighting| sighting.timestamp);

    debug!(%reference_day, sightings = sightings.len(), "Assembled sightings");
    Ok(sightings)
}
