//! OLE2 structured storage (compound file) reader.
//!
//! Legacy Excel workbooks are not a flat file: the BIFF record stream lives in
//! a `Workbook` (BIFF8) or `Book` (BIFF5) stream inside an OLE2 container. This
//! module walks the container's FAT, MiniFAT and directory tree far enough to
//! hand back any stream's bytes.

/// Constants for OLE file format
pub mod consts;

/// Windows codepage lookup for legacy byte strings
pub mod codepage;

/// Main OLE file parsing implementation
mod file;

/// Legacy Excel (.xls) workbook reader
pub mod xls;

pub use file::{DirectoryEntry, OleError, OleFile, is_ole_file};
