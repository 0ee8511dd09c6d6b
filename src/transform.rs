//! Row to record transformation.
//!
//! Each data row goes through two filters and one extraction: rows whose
//! cells are all blank are dropped, the four mapped fields are pulled out and
//! trimmed, and rows left without a word are dropped.
use serde::Serialize;

use crate::error::{Error, Result};
use crate::ole::xls::{CellValue, trim_space};

/// Zero-based column positions of the extracted fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub word: usize,
    pub cefr_level: usize,
    pub part_of_speech: usize,
    pub frequency: usize,
}

impl ColumnMap {
    /// Layout of the Kelly Arabic word list
    pub const KELLY: ColumnMap = ColumnMap {
        word: 4,
        cefr_level: 5,
        part_of_speech: 2,
        frequency: 6,
    };

    /// Highest mapped column
    pub fn max_column(&self) -> usize {
        self.word
            .max(self.cefr_level)
            .max(self.part_of_speech)
            .max(self.frequency)
    }
}

/// One output line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub word: String,
    pub cefr_level: String,
    pub part_of_speech: String,
    pub frequency: String,
}

/// What happened to a data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Kept(Record),
    /// Every cell was empty or whitespace
    Blank,
    /// The word field was empty after trimming
    MissingWord,
}

/// Classify a data row, extracting its record if it survives both filters
///
/// A blank row is dropped whatever its length; a non-blank row too short
/// for `columns` fails with [`Error::OutOfRange`].
pub fn classify(row: &[CellValue], row_index: usize, columns: &ColumnMap) -> Result<RowOutcome> {
    if row.iter().all(CellValue::is_blank) {
        return Ok(RowOutcome::Blank);
    }

    let max_column = columns.max_column();
    if row.len() <= max_column {
        return Err(Error::OutOfRange {
            row: row_index,
            column: max_column,
            len: row.len(),
        });
    }

    let record = Record {
        word: field(&row[columns.word]),
        cefr_level: field(&row[columns.cefr_level]),
        part_of_speech: field(&row[columns.part_of_speech]),
        frequency: field(&row[columns.frequency]),
    };

    if record.word.is_empty() {
        return Ok(RowOutcome::MissingWord);
    }
    Ok(RowOutcome::Kept(record))
}

/// The record for a data row, or `None` when a filter drops it
pub fn transform(row: &[CellValue], row_index: usize, columns: &ColumnMap) -> Result<Option<Record>> {
    Ok(match classify(row, row_index, columns)? {
        RowOutcome::Kept(record) => Some(record),
        RowOutcome::Blank | RowOutcome::MissingWord => None,
    })
}

fn field(value: &CellValue) -> String {
    if value.is_falsy() {
        return String::new();
    }
    trim_space(&value.to_string()).to_string()
}
