//! Service calendar resolution.
//!
//! Implements the calendar.txt / calendar_dates.txt rules: a service runs on
//! a date when its weekly pattern covers that date, unless an exception for
//! that exact date says otherwise. An exception always takes precedence over
//! the weekly pattern, and it applies even to services with no calendar row.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::error::ResolveError;
use crate::feed::{Calendar, CalendarDate, ExceptionKind};
use crate::time::parse_service_date;

/// Exceptions that apply to a single date, split by kind.
#[derive(Debug, Default, PartialEq, Eq)]
struct DateExceptions<'a> {
    added: HashSet<&'a str>,
    removed: HashSet<&'a str>,
}

impl<'a> DateExceptions<'a> {
    /// Collects the exceptions for `date`.
    ///
    /// When one service has both an Added and a Removed row for the same
    /// date, Removed wins regardless of row order.
    fn collect(exceptions: &'a [CalendarDate], date: NaiveDate) -> Result<Self, ResolveError> {
        let mut found = DateExceptions::default();

        for exception in exceptions {
            let exception_date =
                parse_service_date(&exception.date).map_err(|source| ResolveError::MalformedDate {
                    service_id: exception.service_id.clone(),
                    field: "exception date",
                    source,
                })?;
            if exception_date != date {
                continue;
            }
            match exception.kind {
                ExceptionKind::Added => found.added.insert(exception.service_id.as_str()),
                ExceptionKind::Removed => found.removed.insert(exception.service_id.as_str()),
            };
        }

        let conflicting: Vec<&str> = found.added.intersection(&found.removed).copied().collect();
        for service_id in conflicting {
            debug!(service_id, %date, "Conflicting exceptions, keeping removal");
            found.added.remove(service_id);
        }

        Ok(found)
    }
}

/// Whether `date` falls inside the calendar's inclusive validity range.
fn in_validity_range(calendar: &Calendar, date: NaiveDate) -> Result<bool, ResolveError> {
    let parse = |value: &str, field: &'static str| {
        parse_service_date(value).map_err(|source| ResolveError::MalformedDate {
            service_id: calendar.service_id.clone(),
            field,
            source,
        })
    };
    let start = parse(&calendar.start, "start_date")?;
    let end = parse(&calendar.end, "end_date")?;
    Ok(start <= date && date <= end)
}

/// Returns the ids of every service running on `date`.
///
/// # Errors
///
/// Returns [`ResolveError::MalformedDate`] if any calendar start/end or any
/// exception date is not a valid `YYYYMMDD` string. Every row is checked,
/// not only those relevant to `date`.
pub fn active_services_on<'a>(
    calendars: &'a [Calendar],
    exceptions: &'a [CalendarDate],
    date: NaiveDate,
) -> Result<HashSet<&'a str>, ResolveError> {
    let weekday = date.weekday();
    let date_exceptions = DateExceptions::collect(exceptions, date)?;

    let mut active = HashSet::new();
    for calendar in calendars {
        let service_id = calendar.service_id.as_str();
        if in_validity_range(calendar, date)?
            && calendar.runs_on_weekday(weekday)
            && !date_exceptions.removed.contains(service_id)
        {
            active.insert(service_id);
        }
    }
    active.extend(date_exceptions.added.iter().copied());

    debug!(
        %date,
        %weekday,
        added = date_exceptions.added.len(),
        removed = date_exceptions.removed.len(),
        active = active.len(),
        "Resolved active services"
    );
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEEKDAYS: [bool; 7] = [true, true, true, true, true, false, false];

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar(service_id: &str, start: &str, end: &str, weekdays: [bool; 7]) -> Calendar {
        Calendar {
            service_id: service_id.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            weekdays,
        }
    }

    fn exception(service_id: &str, date: &str, kind: ExceptionKind) -> CalendarDate {
        CalendarDate {
            service_id: service_id.to_string(),
            date: date.to_string(),
            kind,
        }
    }

    fn wk1() -> Vec<Calendar> {
        vec![calendar("wk1", "20240101", "20241231", WEEKDAYS)]
    }

    #[test]
    fn test_weekday_in_range_is_active() {
        let calendars = wk1();
        // 2024-03-13 is a Wednesday
        let active = active_services_on(&calendars, &[], date(2024, 3, 13)).unwrap();
        assert_eq!(active, HashSet::from(["wk1"]));
    }

    #[test]
    fn test_unset_weekday_is_inactive() {
        let calendars = wk1();
        // 2024-03-16 is a Saturday
        let active = active_services_on(&calendars, &[], date(2024, 3, 16)).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn test_range_is_inclusive() {
        let calendars = vec![calendar("c", "20240311", "20240315", [true; 7])];

        assert!(active_services_on(&calendars, &[], date(2024, 3, 10)).unwrap().is_empty());
        assert!(active_services_on(&calendars, &[], date(2024, 3, 11)).unwrap().contains("c"));
        assert!(active_services_on(&calendars, &[], date(2024, 3, 15)).unwrap().contains("c"));
        assert!(active_services_on(&calendars, &[], date(2024, 3, 16)).unwrap().is_empty());
    }

    #[test]
    fn test_removed_exception_overrides_calendar() {
        let calendars = wk1();
        let exceptions = vec![exception("wk1", "20240313", ExceptionKind::Removed)];

        let active = active_services_on(&calendars, &exceptions, date(2024, 3, 13)).unwrap();
        assert!(!active.contains("wk1"));

        // Other dates are untouched
        let active = active_services_on(&calendars, &exceptions, date(2024, 3, 14)).unwrap();
        assert!(active.contains("wk1"));
    }

    #[test]
    fn test_added_exception_without_calendar() {
        let exceptions = vec![exception("special", "20240714", ExceptionKind::Added)];

        let active = active_services_on(&[], &exceptions, date(2024, 7, 14)).unwrap();
        assert_eq!(active, HashSet::from(["special"]));

        let active = active_services_on(&[], &exceptions, date(2024, 7, 15)).unwrap();
        assert!(active.is_empty());
    }

    #[test]
    fn test_added_exception_on_unset_weekday() {
        let calendars = wk1();
        // Saturday, not part of the weekly pattern
        let exceptions = vec![exception("wk1", "20240316", ExceptionKind::Added)];
        let active = active_services_on(&calendars, &exceptions, date(2024, 3, 16)).unwrap();
        assert_eq!(active, HashSet::from(["wk1"]));
    }

    #[test]
    fn test_added_and_recurring_counted_once() {
        let calendars = wk1();
        let exceptions = vec![exception("wk1", "20240313", ExceptionKind::Added)];
        let active = active_services_on(&calendars, &exceptions, date(2024, 3, 13)).unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn test_conflicting_exceptions_removed_wins() {
        let day = date(2024, 3, 13);
        let add_then_remove = vec![
            exception("wk1", "20240313", ExceptionKind::Added),
            exception("wk1", "20240313", ExceptionKind::Removed),
        ];
        let remove_then_add: Vec<_> = add_then_remove.iter().rev().cloned().collect();

        assert!(active_services_on(&wk1(), &add_then_remove, day).unwrap().is_empty());
        assert!(active_services_on(&wk1(), &remove_then_add, day).unwrap().is_empty());
        assert!(active_services_on(&[], &remove_then_add, day).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_calendar_date_is_an_error() {
        let calendars = vec![calendar("wk1", "2024-01-01", "20241231", WEEKDAYS)];
        let err = active_services_on(&calendars, &[], date(2024, 3, 13)).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MalformedDate { field: "start_date", ref service_id, .. } if service_id == "wk1"
        ));
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_malformed_exception_date_is_an_error() {
        let exceptions = vec![exception("wk1", "tomorrow", ExceptionKind::Removed)];
        let err = active_services_on(&wk1(), &exceptions, date(2024, 3, 13)).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedDate { field: "exception date", .. }));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn day_strategy() -> impl Strategy<Value = NaiveDate> {
        (0i64..730).prop_map(|offset| {
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(offset)
        })
    }

    fn calendars_strategy() -> impl Strategy<Value = Vec<Calendar>> {
        prop::collection::vec(
            (0usize..6, day_strategy(), 0i64..400, prop::array::uniform7(any::<bool>())),
            0..8,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .map(|(service, start, span, weekdays)| Calendar {
                    service_id: format!("svc{service}"),
                    start: crate::time::format_service_date(start),
                    end: crate::time::format_service_date(start + chrono::Duration::days(span)),
                    weekdays,
                })
                .collect()
        })
    }

    fn exceptions_strategy(around: NaiveDate) -> impl Strategy<Value = Vec<CalendarDate>> {
        prop::collection::vec((0usize..8, -2i64..3, any::<bool>()), 0..12).prop_map(move |rows| {
            rows.into_iter()
                .map(|(service, shift, removed)| CalendarDate {
                    service_id: format!("svc{service}"),
                    date: crate::time::format_service_date(around + chrono::Duration::days(shift)),
                    kind: if removed {
                        ExceptionKind::Removed
                    } else {
                        ExceptionKind::Added
                    },
                })
                .collect()
        })
    }

    fn day_with_exceptions() -> impl Strategy<Value = (NaiveDate, Vec<CalendarDate>)> {
        day_strategy().prop_flat_map(|day| (Just(day), exceptions_strategy(day)))
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(
            calendars in calendars_strategy(),
            (day, exceptions) in day_with_exceptions(),
        ) {
            let first = active_services_on(&calendars, &exceptions, day).unwrap();
            let second = active_services_on(&calendars, &exceptions, day).unwrap();
            prop_assert_eq!(&first, &second);

            let reversed: Vec<CalendarDate> = exceptions.iter().rev().cloned().collect();
            let third = active_services_on(&calendars, &reversed, day).unwrap();
            prop_assert_eq!(first, third);
        }

        #[test]
        fn removal_always_excludes(
            calendars in calendars_strategy(),
            day in day_strategy(),
            service in 0usize..6,
        ) {
            let service_id = format!("svc{service}");
            let exceptions = vec![CalendarDate {
                service_id: service_id.clone(),
                date: crate::time::format_service_date(day),
                kind: ExceptionKind::Removed,
            }];
            let active = active_services_on(&calendars, &exceptions, day).unwrap();
            prop_assert!(!active.contains(service_id.as_str()));
        }

        #[test]
        fn addition_always_includes(
            calendars in calendars_strategy(),
            day in day_strategy(),
            service in 0usize..8,
        ) {
            let service_id = format!("svc{service}");
            let exceptions = vec![CalendarDate {
                service_id: service_id.clone(),
                date: crate::time::format_service_date(day),
                kind: ExceptionKind::Added,
            }];
            let active = active_services_on(&calendars, &exceptions, day).unwrap();
            prop_assert!(active.contains(service_id.as_str()));
        }
    }
}
