//! Kelly XLS - converts the Arabic Kelly vocabulary list from a legacy Excel
//! workbook into a headerless CSV
//!
//! The crate carries its own reader for the legacy binary format: an OLE2
//! compound file parser and a BIFF5/BIFF8 record decoder. Legacy 8-bit text
//! is decoded with an explicitly configured encoding rather than the
//! workbook's own CODEPAGE record, which is unreliable in old exports.
//!
//! # Features
//!
//! - **OLE2 Parser**: FAT, DIFAT, MiniFAT and directory tree traversal
//! - **BIFF Reader**: shared strings across CONTINUE records, RK and MULRK
//!   numbers, cached formula results
//! - **Row filters**: blank rows and rows without a word are dropped
//! - **CSV output**: no header, minimal quoting, CRLF line endings
//!
//! # Example - Converting with the defaults
//!
//! ```no_run
//! use kelly_xls::{Config, pipeline};
//!
//! # fn main() -> Result<(), kelly_xls::Error> {
//! let summary = pipeline::run(&Config::default())?;
//! println!("Written {}", summary.output.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Reading cells directly
//!
//! ```no_run
//! use kelly_xls::ole::xls::XlsWorkbook;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workbook = XlsWorkbook::open("references/ar_m3.xls", encoding_rs::WINDOWS_1256)?;
//! let sheet = workbook.worksheet(0)?;
//! for row in sheet.rows().take(3) {
//!     let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
//!     println!("{}", cells.join(" | "));
//! }
//! # Ok(())
//! # }
//! ```

/// Bounds-checked little-endian readers
pub mod binary;

/// Run configuration and defaults
pub mod config;

/// Crate-level error type
pub mod error;

/// Sheet preview for the `inspect` command
pub mod inspect;

/// OLE2 container and legacy Excel reader
pub mod ole;

/// Conversion run
pub mod pipeline;

/// Row filters and field extraction
pub mod transform;

/// CSV output
pub mod writer;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::Summary;
pub use transform::{ColumnMap, Record, RowOutcome};
