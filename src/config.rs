//! Run configuration.
//!
//! The converter has no configuration file; a run is fully described by a
//! [`Config`] value, whose defaults are the paths and encoding the Kelly
//! Arabic list has always been converted with.
use std::path::PathBuf;

use encoding_rs::Encoding;

use crate::error::{Error, Result};
use crate::ole::codepage;
use crate::transform::ColumnMap;

/// Workbook read by default
pub const DEFAULT_INPUT: &str = "references/ar_m3.xls";

/// CSV written by default
pub const DEFAULT_OUTPUT: &str = "data/arabic_from_csv.csv";

/// Legacy encoding for 8-bit strings in the workbook
pub const DEFAULT_ENCODING: &str = "cp1252";

/// Everything one conversion run needs
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub encoding: &'static Encoding,
    pub columns: ColumnMap,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            encoding: encoding_rs::WINDOWS_1252,
            columns: ColumnMap::KELLY,
        }
    }
}

impl Config {
    /// Build a config, resolving `encoding` to a single-byte encoding
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        encoding: &str,
    ) -> Result<Self> {
        Ok(Config {
            input: input.into(),
            output: output.into(),
            encoding: resolve_encoding(encoding)?,
            columns: ColumnMap::KELLY,
        })
    }
}

/// Resolve an encoding label such as `cp1252` or `windows-1256`
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    codepage::resolve_label(label).ok_or_else(|| Error::UnknownEncoding(label.to_string()))
}
