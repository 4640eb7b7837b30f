//! Validity-period computation over feed calendars.
//!
//! Two variants share the contract `compute(archive) -> ValidityPeriod`:
//! [`calendar::compute`] reads the GTFS calendar tables, [`versioned::compute`]
//! reads a single header-less versioned calendar table.

pub mod calendar;
pub mod versioned;

use chrono::NaiveDate;
use serde::Serialize;

use crate::errors::{Error, Result};

/// Inclusive date interval summarizing when a feed is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidityPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Running bound while scanning calendar sources. Starts at the "unset"
/// sentinels (max representable start, min representable end), narrows
/// inward as dates arrive, and may be trimmed from the outside in.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DateAccumulator {
    pub(crate) start_date: NaiveDate,
    pub(crate) end_date: NaiveDate,
}

impl DateAccumulator {
    pub(crate) fn new() -> DateAccumulator {
        DateAccumulator {
            start_date: NaiveDate::MAX,
            end_date: NaiveDate::MIN,
        }
    }

    /// Widens the bound to include `date` on both sides.
    pub(crate) fn cover(&mut self, date: NaiveDate) {
        if date < self.start_date {
            self.start_date = date;
        }
        if date > self.end_date {
            self.end_date = date;
        }
    }

    /// Converts into a period; fails when either bound never left its
    /// sentinel or the bounds crossed while trimming.
    pub(crate) fn into_period(self, table: &str) -> Result<ValidityPeriod> {
        if self.start_date == NaiveDate::MAX
            || self.end_date == NaiveDate::MIN
            || self.start_date > self.end_date
        {
            return Err(Error::invalid_file(
                table,
                "impossible to find validity period",
            ));
        }
        Ok(ValidityPeriod {
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_accumulator_starts_unset() {
        let acc = DateAccumulator::new();
        assert!(acc.into_period("calendar.txt").is_err());
    }

    #[test]
    fn test_cover_narrows_from_sentinels() {
        let mut acc = DateAccumulator::new();
        acc.cover(d(2018, 1, 15));
        acc.cover(d(2018, 1, 1));
        acc.cover(d(2018, 1, 31));
        let period = acc.into_period("calendar.txt").unwrap();
        assert_eq!(period.start_date, d(2018, 1, 1));
        assert_eq!(period.end_date, d(2018, 1, 31));
    }

    #[test]
    fn test_crossed_bounds_fail() {
        let mut acc = DateAccumulator::new();
        acc.start_date = d(2018, 2, 1);
        acc.end_date = d(2018, 1, 1);
        assert!(acc.into_period("calendar.txt").is_err());
    }
}
