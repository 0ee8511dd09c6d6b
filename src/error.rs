//! Crate-level error type.
//!
//! Each variant is a distinct failure kind of a conversion run, and the
//! binary maps them to distinct exit codes.
use std::path::PathBuf;

use thiserror::Error;

use crate::ole::xls::XlsError;

/// Main error type for conversion runs.
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be opened, read, created or written
    #[error("cannot access {}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is not a readable legacy workbook
    #[error("{} is not a readable .xls workbook", path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: XlsError,
    },

    /// A data row is too short for the column mapping
    #[error("row {row} has {len} cells, column {column} is out of range")]
    OutOfRange { row: usize, column: usize, len: usize },

    /// The configured encoding label names no single-byte encoding
    #[error("unknown or unsupported legacy encoding '{0}'")]
    UnknownEncoding(String),
}

impl Error {
    /// Process exit code for this failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::FileAccess { .. } => 2,
            Error::Format { .. } => 3,
            Error::OutOfRange { .. } => 4,
            Error::UnknownEncoding(_) => 1,
        }
    }
}

/// Result type for conversion runs.
pub type Result<T> = std::result::Result<T, Error>;
