//! In-memory GTFS tables.
//!
//! A [`Feed`] is a read-only snapshot; nothing in the query path mutates it,
//! so one loaded feed can serve any number of queries.

mod loader;

use std::collections::HashMap;

use chrono::Weekday;

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub id: String,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: String,
    pub route_id: String,
    pub service_id: String,
    pub headsign: String,
}

/// One scheduled visit of a trip to a stop.
///
/// `departure` is the raw `HH:MM:SS` string; the hour may exceed 23.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    pub departure: String,
}

/// A recurring weekly service pattern from calendar.txt.
///
/// `start` and `end` are the raw `YYYYMMDD` strings, both inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
    pub service_id: String,
    pub start: String,
    pub end: String,
    /// Indexed by `Weekday::num_days_from_monday`
    pub weekdays: [bool; 7],
}

impl Calendar {
    /// Whether the weekly pattern includes `weekday`.
    pub fn runs_on_weekday(&self, weekday: Weekday) -> bool {
        self.weekdays[weekday.num_days_from_monday() as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    Added,
    Removed,
}

/// A single-date override from calendar_dates.txt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDate {
    pub service_id: String,
    pub date: String,
    pub kind: ExceptionKind,
}

/// All tables needed to answer a sightings query.
///
/// Routes and trips are keyed by their identifier.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub stops: Vec<Stop>,
    pub routes: HashMap<String, Route>,
    pub trips: HashMap<String, Trip>,
    pub calendars: Vec<Calendar>,
    pub calendar_dates: Vec<CalendarDate>,
    pub stop_times: Vec<StopTime>,
}
