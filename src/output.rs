//! Output formatting and persistence for sightings.
//!
//! Supports plain text lines, JSON serialization, and CSV append.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::sightings::Sighting;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Flat, serializable view of a [`Sighting`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SightingRecord {
    /// Local wall-clock time, `HH:MM`
    pub time: String,
    /// RFC 3339 timestamp with offset
    pub timestamp: String,
    pub route: String,
    pub headsign: String,
}

impl From<&Sighting> for SightingRecord {
    fn from(sighting: &Sighting) -> Self {
        Self {
            time: sighting.timestamp.format("%H:%M").to_string(),
            timestamp: sighting.timestamp.to_rfc3339(),
            route: sighting.route_name.clone(),
            headsign: sighting.headsign.clone(),
        }
    }
}

/// Writes one `Bus: <route> -> <headsign>, at HH:MM` line per sighting,
/// or `No buses` when there are none.
pub fn write_text<W: Write>(out: &mut W, sightings: &[Sighting]) -> Result<()> {
    if sightings.is_empty() {
        writeln!(out, "No buses")?;
        return Ok(());
    }
    for sighting in sightings {
        writeln!(
            out,
            "Bus: {} -> {}, at {}",
            sighting.route_name,
            sighting.headsign,
            sighting.timestamp.format("%H:%M")
        )?;
    }
    Ok(())
}

/// Serializes sightings as a pretty-printed JSON array.
pub fn to_json(sightings: &[Sighting]) -> Result<String> {
    let records: Vec<SightingRecord> = sightings.iter().map(SightingRecord::from).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Appends sightings as rows to a CSV file.
///
/// Creates the file with headers if it does not already exist. Nothing is
/// written for an empty list.
pub fn append_records(path: &Path, sightings: &[Sighting]) -> Result<()> {
    // An empty file would later be appended to without a header
    if sightings.is_empty() {
        return Ok(());
    }

    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, rows = sightings.len(), "Appending CSV records");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    for sighting in sightings {
        writer.serialize(SightingRecord::from(sighting))?;
    }
    writer.flush()?;

    Ok(())
}
