//! Error types for the feed preparation pipeline.
//!
//! Three failure classes matter to callers:
//!
//! - [`Error::InvalidFile`] - a malformed or missing archive, table, or
//!   member; aborts the transform step.
//! - [`Error::Parameter`] - a step was configured against a data-source
//!   slot or option that does not exist; surfaced at configuration time.
//! - [`Error::Integrity`] - a per-trip precondition failed; recovered
//!   locally (the trip is skipped), never aborts the batch.
//!
//! I/O, CSV and JSON sources convert automatically so `?` works across
//! module boundaries.

use thiserror::Error;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing archive, table, or archive member. Always
    /// names the offending file.
    #[error("invalid file '{file}': {reason}")]
    InvalidFile { file: String, reason: String },

    /// A configured reference (data-source slot, step option) does not
    /// exist.
    #[error("unknown parameter reference: {0}")]
    Parameter(String),

    /// A per-record precondition failed. Callers catch this per record
    /// and continue the batch.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// Filesystem error outside any particular table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error outside of table validation.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Builds an [`Error::InvalidFile`] naming the offending file or table.
    pub fn invalid_file(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidFile {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_file_names_the_file() {
        let err = Error::invalid_file("calendar.txt", "missing columns: start_date");
        let msg = err.to_string();
        assert!(msg.contains("calendar.txt"));
        assert!(msg.contains("start_date"));
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> Result<()> {
            std::fs::read("/definitely/not/a/real/path")?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Io(_))));
    }
}
