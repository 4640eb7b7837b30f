//! Trip direction inference from canonical stop orders.
//!
//! Each route carries a canonical forward stop sequence. A trip's actual
//! recorded stop order is compared against it pair by pair; a majority
//! vote over the consecutive reference pairs decides whether the trip runs
//! forward ("0") or reverse ("1"). The vote tolerates local sequence noise
//! where an exact-match comparison would not.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::archive;
use crate::dataset::{CellValue, ColumnType, Dataset, LoadOptions};
use crate::errors::{Error, Result};

const TRIPS: &str = "trips.txt";
const STOP_TIMES: &str = "stop_times.txt";

/// Traversal direction of a trip along its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    /// GTFS `direction_id` flag value.
    pub fn flag(self) -> &'static str {
        match self {
            Direction::Outbound => "0",
            Direction::Inbound => "1",
        }
    }
}

/// Canonical forward stop sequence for one route, as configured.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceStopOrder {
    pub route_id: String,
    pub stops: Vec<String>,
}

/// Loads the route reference file: a JSON array of
/// `{ "route_id": ..., "stops": [...] }` objects.
pub fn load_reference(path: &Path) -> Result<Vec<ReferenceStopOrder>> {
    let display = path.display().to_string();
    let file = File::open(path)
        .map_err(|e| Error::invalid_file(&display, format!("cannot open: {}", e)))?;
    let references: Vec<ReferenceStopOrder> = serde_json::from_reader(file)
        .map_err(|e| Error::invalid_file(&display, format!("cannot parse as JSON: {}", e)))?;
    Ok(references)
}

/// Actual recorded stop order for one trip, ascending by sequence number.
#[derive(Debug, Clone)]
pub struct TripStopSequence {
    pub trip_id: String,
    pub route_id: String,
    pub stops: Vec<String>,
}

/// Infers a direction flag per trip. Trips whose stops share fewer than
/// two stops with their route reference are skipped with a warning and do
/// not appear in the result; the caller must leave their original flag
/// untouched. Trips on routes without a reference are likewise absent.
pub fn infer_directions(
    references: &[ReferenceStopOrder],
    trips: &[TripStopSequence],
) -> HashMap<String, Direction> {
    let by_route: HashMap<&str, &[String]> = references
        .iter()
        .map(|r| (r.route_id.as_str(), r.stops.as_slice()))
        .collect();

    let mut directions = HashMap::new();
    for trip in trips {
        let Some(reference) = by_route.get(trip.route_id.as_str()) else {
            debug!(trip_id = %trip.trip_id, route_id = %trip.route_id, "No reference order for route");
            continue;
        };
        match trip_direction(reference, trip) {
            Ok(direction) => {
                directions.insert(trip.trip_id.clone(), direction);
            }
            Err(e) => {
                warn!(trip_id = %trip.trip_id, error = %e, "Skipping trip, keeping its original direction");
            }
        }
    }
    directions
}

/// Majority vote for a single trip against its route reference.
fn trip_direction(reference: &[String], trip: &TripStopSequence) -> Result<Direction> {
    // Recorded position of each stop; first occurrence wins.
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (idx, stop) in trip.stops.iter().enumerate() {
        positions.entry(stop.as_str()).or_insert(idx);
    }

    // Reduce the reference to stops the trip actually visits, preserving
    // reference order; duplicates collapse to their first occurrence.
    let mut reduced: Vec<&str> = Vec::new();
    for stop in reference {
        if positions.contains_key(stop.as_str()) && !reduced.contains(&stop.as_str()) {
            reduced.push(stop.as_str());
        }
    }

    if reduced.len() < 2 {
        return Err(Error::Integrity(format!(
            "trip '{}' shares only {} stop(s) with the reference order of route '{}'",
            trip.trip_id,
            reduced.len(),
            trip.route_id
        )));
    }

    let total = reduced.len() - 1;
    let mut agreeing = 0;
    for pair in reduced.windows(2) {
        if positions[pair[1]] > positions[pair[0]] {
            agreeing += 1;
        }
    }

    if agreeing * 2 < total {
        Ok(Direction::Inbound)
    } else {
        Ok(Direction::Outbound)
    }
}

/// Rewrites `direction_id` for the trips present in `directions`; all
/// other trips keep their original value.
pub fn apply_directions(
    trips: &mut Dataset,
    directions: &HashMap<String, Direction>,
) -> Result<()> {
    trips.apply_in_place("direction_id", |row| {
        let resolved = match row.get("trip_id") {
            Some(CellValue::Text(id)) => directions.get(id.as_str()),
            _ => None,
        };
        match resolved {
            Some(direction) => CellValue::Text(direction.flag().to_string()),
            None => row.get("direction_id").cloned().unwrap_or(CellValue::Missing),
        }
    })
}

/// Builds per-trip stop sequences from `stop_times.txt` rows, sorted by
/// their recorded sequence numbers, joined with each trip's route.
fn trip_sequences(
    stop_times: &Dataset,
    trip_routes: &HashMap<String, String>,
) -> Result<Vec<TripStopSequence>> {
    let mut grouped: HashMap<String, Vec<(i64, String)>> = HashMap::new();
    for row in stop_times.rows() {
        let trip_id = match row.get("trip_id") {
            Some(CellValue::Text(id)) => id.clone(),
            _ => return Err(Error::invalid_file(STOP_TIMES, "row without a trip_id")),
        };
        let stop_id = match row.get("stop_id") {
            Some(CellValue::Text(id)) => id.clone(),
            _ => return Err(Error::invalid_file(STOP_TIMES, "row without a stop_id")),
        };
        let sequence = row
            .get("stop_sequence")
            .and_then(|c| c.as_integer())
            .ok_or_else(|| Error::invalid_file(STOP_TIMES, "row without a stop_sequence"))?;
        grouped.entry(trip_id).or_default().push((sequence, stop_id));
    }

    let mut sequences = Vec::with_capacity(grouped.len());
    for (trip_id, mut stops) in grouped {
        let Some(route_id) = trip_routes.get(&trip_id) else {
            debug!(trip_id = %trip_id, "Trip has stop times but no trips.txt row");
            continue;
        };
        stops.sort_by_key(|(sequence, _)| *sequence);
        sequences.push(TripStopSequence {
            trip_id,
            route_id: route_id.clone(),
            stops: stops.into_iter().map(|(_, stop)| stop).collect(),
        });
    }
    Ok(sequences)
}

/// Infers directions for every trip in `archive` and rewrites the
/// `direction_id` column of its `trips.txt`, returning the path of the new
/// archive. Trips the inference skipped keep their original flag.
pub fn rewrite_trip_directions(archive_path: &Path, reference_path: &Path) -> Result<PathBuf> {
    let references = load_reference(reference_path)?;

    let stop_times_options = LoadOptions::csv(b',')
        .select(&["trip_id", "stop_id", "stop_sequence"])
        .with_type("stop_sequence", ColumnType::Integer);
    let stop_times = Dataset::load_zip_member(archive_path, STOP_TIMES, &stop_times_options)?;

    let trips_table = Dataset::load_zip_member(
        archive_path,
        TRIPS,
        &LoadOptions::csv(b',').select(&["trip_id", "route_id"]),
    )?;
    let trip_routes: HashMap<String, String> = trips_table
        .derive_by_key("trip_id", &["route_id"], |row| {
            row.get("route_id").cloned().unwrap_or(CellValue::Missing)
        })?
        .into_iter()
        .filter_map(|(trip_id, route)| match route {
            CellValue::Text(route_id) => Some((trip_id, route_id)),
            _ => None,
        })
        .collect();

    let sequences = trip_sequences(&stop_times, &trip_routes)?;
    let directions = infer_directions(&references, &sequences);
    info!(
        trips = sequences.len(),
        resolved = directions.len(),
        "Trip directions inferred"
    );

    archive::edit(archive_path, TRIPS, |extracted| {
        let mut trips = Dataset::load_path(extracted, &LoadOptions::csv(b','))?;
        apply_directions(&mut trips, &directions)?;
        trips.save_csv(extracted)
    })
}
