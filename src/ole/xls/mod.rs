//! Legacy Excel (.xls) file format reader
//!
//! Parses the BIFF5 and BIFF8 record streams stored inside OLE2 containers.
//! Only cell values are decoded; formatting, formulas and drawing records are
//! skipped.

/// Error types for XLS parsing
mod error;

/// BIFF record parsing utilities
pub mod records;

/// BIFF string decoding
pub mod strings;

/// Workbook parsing implementation
mod workbook;

/// Worksheet parsing implementation
mod worksheet;

/// Cell value representation
mod cell;

#[cfg(test)]
pub(crate) mod fixture;

pub use cell::{CellValue, is_space, trim_space};
pub use error::{XlsError, XlsResult};
pub use records::BiffVersion;
pub use workbook::XlsWorkbook;
pub use worksheet::XlsWorksheet;
