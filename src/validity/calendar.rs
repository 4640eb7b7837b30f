//! Calendar-based validity period (GTFS `calendar.txt` family).
//!
//! Resolution order:
//! 1. A single-row `feed_info.txt` with both dates set wins outright.
//! 2. Otherwise `[min(start_date), max(end_date)]` over `calendar.txt`.
//! 3. `calendar_dates.txt` then adjusts the bound: effective added dates
//!    (added and not also removed) widen it outward; removed dates trim a
//!    bound only while they sit exactly on it. Interior removed dates are
//!    deliberately ignored, matching common transit-feed tooling.

use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dataset::{ColumnType, Dataset, LoadOptions};
use crate::errors::{Error, Result};
use crate::validity::{DateAccumulator, ValidityPeriod};

const FEED_INFO: &str = "feed_info.txt";
const CALENDAR: &str = "calendar.txt";
const CALENDAR_DATES: &str = "calendar_dates.txt";

const GTFS_DATE_FORMAT: &str = "%Y%m%d";

/// `calendar_dates.txt` exception kinds.
const EXCEPTION_ADDED: i64 = 1;
const EXCEPTION_REMOVED: i64 = 2;

/// Computes the validity period of a GTFS archive.
pub fn compute(archive: &Path) -> Result<ValidityPeriod> {
    let members = member_names(archive)?;

    if !members.contains(CALENDAR) && !members.contains(CALENDAR_DATES) {
        return Err(Error::invalid_file(
            archive.display().to_string(),
            format!("neither {} nor {} is present", CALENDAR, CALENDAR_DATES),
        ));
    }

    // A declared feed_info period takes precedence over computed bounds.
    if members.contains(FEED_INFO) {
        if let Some(period) = feed_info_period(archive)? {
            debug!(start = %period.start_date, end = %period.end_date, "Using declared feed_info period");
            return Ok(period);
        }
    }

    let mut acc = DateAccumulator::new();

    if members.contains(CALENDAR) {
        scan_calendar(archive, &mut acc)?;
    }
    if members.contains(CALENDAR_DATES) {
        scan_exceptions(archive, &mut acc)?;
    }

    acc.into_period(CALENDAR)
}

fn member_names(archive: &Path) -> Result<HashSet<String>> {
    let display = archive.display().to_string();
    let file = File::open(archive)
        .map_err(|e| Error::invalid_file(&display, format!("cannot open: {}", e)))?;
    let zip = zip::ZipArchive::new(file)
        .map_err(|e| Error::invalid_file(&display, format!("not a valid zip archive: {}", e)))?;
    Ok(zip.file_names().map(str::to_string).collect())
}

/// Reads the declared start/end pair from `feed_info.txt`. `None` when the
/// columns are absent or either date is missing; more than one row is
/// ambiguous and fails.
fn feed_info_period(archive: &Path) -> Result<Option<ValidityPeriod>> {
    let options = LoadOptions::csv(b',')
        .with_type("feed_start_date", ColumnType::Date)
        .with_type("feed_end_date", ColumnType::Date)
        .with_date_format(GTFS_DATE_FORMAT);
    let table = Dataset::load_zip_member(archive, FEED_INFO, &options)?;

    if table.row_count() > 1 {
        return Err(Error::invalid_file(
            FEED_INFO,
            format!("expected a single row, found {}", table.row_count()),
        ));
    }

    let start = table.cell(0, "feed_start_date").and_then(|c| c.as_date());
    let end = table.cell(0, "feed_end_date").and_then(|c| c.as_date());

    match (start, end) {
        (Some(start_date), Some(end_date)) => Ok(Some(ValidityPeriod {
            start_date,
            end_date,
        })),
        _ => Ok(None),
    }
}

fn scan_calendar(archive: &Path, acc: &mut DateAccumulator) -> Result<()> {
    let options = LoadOptions::csv(b',')
        .select(&["start_date", "end_date"])
        .with_type("start_date", ColumnType::Date)
        .with_type("end_date", ColumnType::Date)
        .with_date_format(GTFS_DATE_FORMAT);
    let table = Dataset::load_zip_member(archive, CALENDAR, &options)?;

    if table.row_count() == 0 {
        return Ok(());
    }

    if let Some(date) = table.min("start_date")?.as_date() {
        acc.cover(date);
    }
    if let Some(date) = table.max("end_date")?.as_date() {
        acc.cover(date);
    }
    Ok(())
}

fn scan_exceptions(archive: &Path, acc: &mut DateAccumulator) -> Result<()> {
    let options = LoadOptions::csv(b',')
        .select(&["date", "exception_type"])
        .with_type("date", ColumnType::Date)
        .with_type("exception_type", ColumnType::Integer)
        .with_date_format(GTFS_DATE_FORMAT);
    let table = Dataset::load_zip_member(archive, CALENDAR_DATES, &options)?;

    let mut added: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut removed: BTreeSet<NaiveDate> = BTreeSet::new();
    for row in table.rows() {
        let date = match row.get("date").and_then(|c| c.as_date()) {
            Some(date) => date,
            None => {
                return Err(Error::invalid_file(CALENDAR_DATES, "row without a date"));
            }
        };
        match row.get("exception_type").and_then(|c| c.as_integer()) {
            Some(EXCEPTION_ADDED) => {
                added.insert(date);
            }
            Some(EXCEPTION_REMOVED) => {
                removed.insert(date);
            }
            other => {
                warn!(date = %date, exception_type = ?other, "Ignoring unknown exception type");
            }
        }
    }

    // A removal on the same date cancels the addition, so only effective
    // added dates can widen the bound. Outside-in scan against the running
    // bound: once a date is no longer more extreme, the run is over.
    let effective: Vec<NaiveDate> = added.difference(&removed).copied().collect();
    for &date in &effective {
        if date < acc.start_date {
            acc.start_date = date;
        } else {
            break;
        }
    }
    for &date in effective.iter().rev() {
        if date > acc.end_date {
            acc.end_date = date;
        } else {
            break;
        }
    }

    // Removed dates trim a bound only while they sit exactly on it.
    // Interior removed dates never split or shrink the period.
    while removed.contains(&acc.start_date) {
        match acc.start_date.succ_opt() {
            Some(next) => acc.start_date = next,
            None => break,
        }
    }
    while removed.contains(&acc.end_date) {
        match acc.end_date.pred_opt() {
            Some(prev) => acc.end_date = prev,
            None => break,
        }
    }

    Ok(())
}
