//! Selection of stops near a query point.
//!
//! Distances use a local planar approximation: degree differences are scaled
//! to kilometers with one fixed factor for both axes. This is only meaningful
//! for short distances away from the poles.

use std::collections::HashMap;

use tracing::debug;

use crate::config::QueryConfig;
use crate::feed::Stop;

/// Planar distance in kilometers between a stop and a point.
pub fn approx_distance_km(stop: &Stop, lat: f64, lon: f64, degrees_per_km: f64) -> f64 {
    squared_distance_km(stop, lat, lon, degrees_per_km).sqrt()
}

fn squared_distance_km(stop: &Stop, lat: f64, lon: f64, degrees_per_km: f64) -> f64 {
    let lat_km = (stop.latitude - lat) / degrees_per_km;
    let lon_km = (stop.longitude - lon) / degrees_per_km;
    lat_km * lat_km + lon_km * lon_km
}

/// Returns the stops within `config.threshold_km` of (`lat`, `lon`), keyed
/// by stop id.
///
/// The bound is inclusive, so a zero threshold still matches a stop at
/// exactly the query point.
pub fn select_close_stops<'a>(
    stops: &'a [Stop],
    lat: f64,
    lon: f64,
    config: &QueryConfig,
) -> HashMap<&'a str, &'a Stop> {
    let max_squared = config.threshold_km * config.threshold_km;

    let close: HashMap<&str, &Stop> = stops
        .iter()
        .filter(|stop| squared_distance_km(stop, lat, lon, config.degrees_per_km) <= max_squared)
        .map(|stop| (stop.id.as_str(), stop))
        .collect();

    debug!(
        lat,
        lon,
        threshold_km = config.threshold_km,
        close = close.len(),
        "Selected close stops"
    );
    close
}
