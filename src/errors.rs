//! Error types for the LOST pipeline
//!
//! Per §7, the core never logs and never aborts the process: every outcome
//! is one of success, well-defined empty, or a structured [`LostError`]
//! returned to the caller. `InsufficientInput` and `StarIdAmbiguous` are
//! represented as empty output rather than as error variants, matching the
//! spec's propagation policy -- callers distinguish those cases by checking
//! the size of the returned collection, not by matching an error.

use thiserror::Error;

/// Top-level error type for database, catalog, and I/O failures.
#[derive(Debug, Error)]
pub enum LostError {
    /// The database bytes fail a sanity check: `min < 0`, `max <= min`,
    /// `numBins <= 0`, non-monotone bins, or a table-of-contents offset out
    /// of range. Fatal for the current invocation; never recovered.
    #[error("database corrupt: {0}")]
    DatabaseCorrupt(String),

    /// A [`crate::multidb::MultiDatabase`] lookup found no sub-database with
    /// the requested magic number.
    #[error("no sub-database with magic number 0x{0:08X}")]
    NoSubDatabase(u32),

    /// Underlying I/O failure (file open, read, mmap).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A catalog text line did not match the expected
    /// `ra|dec|name|flag|mag.decimal` shape.
    #[error("malformed catalog line {line}: {reason}")]
    CatalogParse { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, LostError>;
