//! Error types for XLS file parsing

use crate::binary::BinaryError;
use crate::ole::OleError;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur during XLS file parsing
#[derive(Debug, thiserror::Error)]
pub enum XlsError {
    /// The OLE2 container could not be read
    #[error("CFB error: {0}")]
    Cfb(#[from] OleError),
    /// A record body was shorter than its fields
    #[error("invalid data: {0}")]
    Binary(#[from] BinaryError),
    /// Neither a `Workbook` (BIFF8) nor a `Book` (BIFF5) stream exists
    #[error("no Workbook or Book stream in container")]
    MissingWorkbookStream,
    /// A record header promised more bytes than the stream holds
    #[error("record 0x{record_type:04X} at offset {offset} is truncated")]
    Truncated { record_type: u16, offset: usize },
    /// Invalid data length
    #[error("record 0x{record_type:04X}: expected at least {expected} bytes, found {found}")]
    InvalidLength {
        record_type: u16,
        expected: usize,
        found: usize,
    },
    /// The stream or substream does not start with a BOF record
    #[error("expected BOF record, found 0x{0:04X}")]
    MissingBof(u16),
    /// Unsupported BIFF version
    #[error("unsupported BIFF version 0x{0:04X}")]
    UnsupportedBiffVersion(u16),
    /// Password protected workbook
    #[error("workbook is password protected")]
    PasswordProtected,
    /// A BOUNDSHEET offset points outside the workbook stream
    #[error("sheet '{name}' starts at offset {offset}, outside the workbook stream")]
    InvalidSheetOffset { name: String, offset: u32 },
    /// Worksheet not found
    #[error("worksheet index {index} out of range ({count} worksheets)")]
    WorksheetNotFound { index: usize, count: usize },
    /// LABELSST refers past the end of the shared string table
    #[error("shared string index {index} out of range ({len} strings)")]
    InvalidSstIndex { index: u32, len: usize },
}
