//! Versioned-calendar validity period.
//!
//! Some feed exports carry a single semicolon-delimited, header-less table
//! listing calendar versions with their begin and end dates. The period is
//! simply `[min(begin_date), max(end_date)]` over that table.

use std::path::Path;

use crate::dataset::{ColumnType, Dataset, LoadOptions};
use crate::errors::{Error, Result};
use crate::validity::ValidityPeriod;

/// Default member name of the versioned calendar table.
pub const DEFAULT_MEMBER: &str = "calendar_versions.txt";

const COLUMN_NAMES: [&str; 3] = ["version_id", "begin_date", "end_date"];
const DATE_FORMAT: &str = "%d/%m/%Y";

/// Computes the validity period from the versioned calendar table
/// `member` inside `archive`.
pub fn compute(archive: &Path, member: &str) -> Result<ValidityPeriod> {
    let options = LoadOptions::csv(b';')
        .with_column_names(&COLUMN_NAMES)
        .select(&["begin_date", "end_date"])
        .with_type("begin_date", ColumnType::Date)
        .with_type("end_date", ColumnType::Date)
        .with_date_format(DATE_FORMAT);
    let table = Dataset::load_zip_member(archive, member, &options)?;

    if table.row_count() == 0 {
        return Err(Error::invalid_file(member, "no calendar versions"));
    }

    let start_date = table
        .min("begin_date")?
        .as_date()
        .ok_or_else(|| Error::invalid_file(member, "begin_date is not a date column"))?;
    let end_date = table
        .max("end_date")?
        .as_date()
        .ok_or_else(|| Error::invalid_file(member, "end_date is not a date column"))?;

    Ok(ValidityPeriod {
        start_date,
        end_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::{Cursor, Write};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn fixture(contents: &str) -> tempfile::NamedTempFile {
        let mut buf = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file(DEFAULT_MEMBER, SimpleFileOptions::default())
                .unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&buf).unwrap();
        tmp
    }

    #[test]
    fn test_min_begin_max_end() {
        let archive = fixture("1;15/01/2018;20/02/2018\n2;01/01/2018;31/01/2018\n");
        let period = compute(archive.path(), DEFAULT_MEMBER).unwrap();
        assert_eq!(
            period.start_date,
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
        );
        assert_eq!(
            period.end_date,
            NaiveDate::from_ymd_opt(2018, 2, 20).unwrap()
        );
    }

    #[test]
    fn test_missing_member_fails() {
        let archive = fixture("1;01/01/2018;31/01/2018\n");
        let err = compute(archive.path(), "other.txt").unwrap_err();
        assert!(err.to_string().contains("other.txt"));
    }

    #[test]
    fn test_empty_table_fails() {
        let archive = fixture("");
        assert!(compute(archive.path(), DEFAULT_MEMBER).is_err());
    }
}
