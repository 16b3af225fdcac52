//! Decoding of a GTFS directory into a [`Feed`].

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::{Calendar, CalendarDate, ExceptionKind, Feed, Route, Stop, StopTime, Trip};
use crate::error::FeedError;

const STOPS: &str = "stops.txt";
const ROUTES: &str = "routes.txt";
const TRIPS: &str = "trips.txt";
const STOP_TIMES: &str = "stop_times.txt";
const CALENDAR: &str = "calendar.txt";
const CALENDAR_DATES: &str = "calendar_dates.txt";

#[derive(Deserialize)]
struct StopRow {
    stop_id: String,
    stop_lat: Option<f64>,
    stop_lon: Option<f64>,
}

#[derive(Deserialize)]
struct RouteRow {
    route_id: String,
    #[serde(default)]
    route_short_name: String,
}

#[derive(Deserialize)]
struct TripRow {
    trip_id: String,
    route_id: String,
    service_id: String,
    #[serde(default)]
    trip_headsign: String,
}

#[derive(Deserialize)]
struct StopTimeRow {
    trip_id: String,
    stop_id: String,
    #[serde(default)]
    arrival_time: String,
    #[serde(default)]
    departure_time: String,
}

#[derive(Deserialize)]
struct CalendarRow {
    service_id: String,
    monday: u8,
    tuesday: u8,
    wednesday: u8,
    thursday: u8,
    friday: u8,
    saturday: u8,
    sunday: u8,
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
struct CalendarDateRow {
    service_id: String,
    date: String,
    exception_type: u8,
}

impl Feed {
    /// Loads the GTFS tables found in `dir`.
    ///
    /// `calendar.txt` and `calendar_dates.txt` are optional; the other four
    /// files are required.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] if a required file is missing, a row does not
    /// decode, an id is duplicated, or an enumerated column holds an
    /// unknown value.
    #[tracing::instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>) -> Result<Feed, FeedError> {
        let dir = dir.as_ref();

        let stops = convert_stops(read_table(dir, STOPS)?)?;
        let routes = convert_routes(read_table(dir, ROUTES)?)?;
        let trips = convert_trips(read_table(dir, TRIPS)?)?;
        let stop_times = convert_stop_times(read_table(dir, STOP_TIMES)?);
        let calendars = convert_calendars(read_optional_table(dir, CALENDAR)?)?;
        let calendar_dates = convert_calendar_dates(read_optional_table(dir, CALENDAR_DATES)?)?;

        info!(
            stops = stops.len(),
            routes = routes.len(),
            trips = trips.len(),
            stop_times = stop_times.len(),
            calendars = calendars.len(),
            calendar_dates = calendar_dates.len(),
            "Feed loaded"
        );

        Ok(Feed {
            stops,
            routes,
            trips,
            calendars,
            calendar_dates,
            stop_times,
        })
    }
}

fn read_table<T: DeserializeOwned>(dir: &Path, file: &'static str) -> Result<Vec<T>, FeedError> {
    let path = dir.join(file);
    let reader = File::open(&path).map_err(|source| FeedError::Io {
        path: path.clone(),
        source,
    })?;
    read_rows(reader, file)
}

fn read_optional_table<T: DeserializeOwned>(
    dir: &Path,
    file: &'static str,
) -> Result<Vec<T>, FeedError> {
    if !dir.join(file).exists() {
        debug!(file, "Optional table absent");
        return Ok(Vec::new());
    }
    read_table(dir, file)
}

fn read_rows<T: DeserializeOwned, R: Read>(reader: R, file: &'static str) -> Result<Vec<T>, FeedError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    rdr.deserialize()
        .map(|row| row.map_err(|source| FeedError::Csv { file, source }))
        .collect()
}

fn convert_stops(rows: Vec<StopRow>) -> Result<Vec<Stop>, FeedError> {
    let mut seen = HashSet::new();
    let mut stops = Vec::with_capacity(rows.len());
    let mut without_location = 0usize;

    for row in rows {
        if !seen.insert(row.stop_id.clone()) {
            return Err(FeedError::DuplicateId {
                table: "stop",
                id: row.stop_id,
            });
        }
        // Generic nodes and boarding areas may omit coordinates
        let (Some(latitude), Some(longitude)) = (row.stop_lat, row.stop_lon) else {
            without_location += 1;
            continue;
        };
        stops.push(Stop {
            id: row.stop_id,
            latitude,
            longitude,
        });
    }

    if without_location > 0 {
        debug!(without_location, "Skipped stops without coordinates");
    }
    Ok(stops)
}

fn convert_routes(rows: Vec<RouteRow>) -> Result<HashMap<String, Route>, FeedError> {
    index_unique(
        "route",
        rows.into_iter().map(|row| Route {
            id: row.route_id,
            short_name: row.route_short_name,
        }),
        |route| &route.id,
    )
}

fn convert_trips(rows: Vec<TripRow>) -> Result<HashMap<String, Trip>, FeedError> {
    index_unique(
        "trip",
        rows.into_iter().map(|row| Trip {
            id: row.trip_id,
            route_id: row.route_id,
            service_id: row.service_id,
            headsign: row.trip_headsign,
        }),
        |trip| &trip.id,
    )
}

fn convert_stop_times(rows: Vec<StopTimeRow>) -> Vec<StopTime> {
    let total = rows.len();
    let stop_times: Vec<StopTime> = rows
        .into_iter()
        .filter_map(|row| {
            let departure = if row.departure_time.is_empty() {
                row.arrival_time
            } else {
                row.departure_time
            };
            // Untimed stops are interpolation points with nothing to report
            (!departure.is_empty()).then(|| StopTime {
                trip_id: row.trip_id,
                stop_id: row.stop_id,
                departure,
            })
        })
        .collect();

    let untimed = total - stop_times.len();
    if untimed > 0 {
        debug!(untimed, "Dropped untimed stop times");
    }
    stop_times
}

fn convert_calendars(rows: Vec<CalendarRow>) -> Result<Vec<Calendar>, FeedError> {
    rows.into_iter()
        .map(|row| {
            let weekdays = [
                flag("monday", row.monday)?,
                flag("tuesday", row.tuesday)?,
                flag("wednesday", row.wednesday)?,
                flag("thursday", row.thursday)?,
                flag("friday", row.friday)?,
                flag("saturday", row.saturday)?,
                flag("sunday", row.sunday)?,
            ];
            Ok(Calendar {
                service_id: row.service_id,
                start: row.start_date,
                end: row.end_date,
                weekdays,
            })
        })
        .collect()
}

fn flag(column: &'static str, value: u8) -> Result<bool, FeedError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(FeedError::InvalidValue {
            file: CALENDAR,
            column,
            value: other.to_string(),
        }),
    }
}

fn convert_calendar_dates(rows: Vec<CalendarDateRow>) -> Result<Vec<CalendarDate>, FeedError> {
    rows.into_iter()
        .map(|row| {
            let kind = match row.exception_type {
                1 => ExceptionKind::Added,
                2 => ExceptionKind::Removed,
                other => {
                    return Err(FeedError::InvalidValue {
                        file: CALENDAR_DATES,
                        column: "exception_type",
                        value: other.to_string(),
                    });
                }
            };
            Ok(CalendarDate {
                service_id: row.service_id,
                date: row.date,
                kind,
            })
        })
        .collect()
}

fn index_unique<T>(
    table: &'static str,
    items: impl Iterator<Item = T>,
    id: impl Fn(&T) -> &String,
) -> Result<HashMap<String, T>, FeedError> {
    let mut map = HashMap::new();
    for item in items {
        let key = id(&item).clone();
        if map.contains_key(&key) {
            return Err(FeedError::DuplicateId { table, id: key });
        }
        map.insert(key, item);
    }
    Ok(map)
}
