//! End-to-end conversion run.
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::ole::xls::{XlsWorkbook, XlsWorksheet};
use crate::transform::{ColumnMap, Record, RowOutcome, classify};
use crate::writer::write_records;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub sheet: String,
    /// Rows in the sheet, header included
    pub rows: usize,
    pub columns: usize,
    pub kept: usize,
    pub blank: usize,
    pub missing_word: usize,
    pub output: PathBuf,
    /// Size of the written file
    pub bytes: u64,
}

/// Records extracted from one sheet, with drop counts per filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversion {
    pub records: Vec<Record>,
    pub blank: usize,
    pub missing_word: usize,
}

/// Transform every data row of `sheet`; row 0 is the header and is skipped
pub fn convert_sheet(sheet: &XlsWorksheet, columns: &ColumnMap) -> Result<Conversion> {
    let mut conversion = Conversion::default();

    for (index, row) in sheet.rows().enumerate().skip(1) {
        match classify(&row, index, columns)? {
            RowOutcome::Kept(record) => conversion.records.push(record),
            RowOutcome::Blank => {
                debug!(row = index, "skipping blank row");
                conversion.blank += 1;
            },
            RowOutcome::MissingWord => {
                debug!(row = index, "skipping row without a word");
                conversion.missing_word += 1;
            },
        }
    }

    Ok(conversion)
}

/// Convert the first sheet of `config.input` into `config.output`
///
/// Every row is transformed before the output is opened, so a failing row
/// leaves any existing output file as it was.
pub fn run(config: &Config) -> Result<Summary> {
    let workbook = XlsWorkbook::open(&config.input, config.encoding)?;
    let sheet = workbook.worksheet(0).map_err(|source| Error::Format {
        path: config.input.clone(),
        source,
    })?;
    info!(
        input = %config.input.display(),
        sheet = sheet.name(),
        rows = sheet.row_count(),
        columns = sheet.column_count(),
        "loaded worksheet"
    );

    let conversion = convert_sheet(&sheet, &config.columns)?;
    let bytes = write_records(&conversion.records, &config.output)?;
    info!(
        output = %config.output.display(),
        records = conversion.records.len(),
        bytes,
        "wrote csv"
    );

    Ok(Summary {
        sheet: sheet.name().to_string(),
        rows: sheet.row_count(),
        columns: sheet.column_count(),
        kept: conversion.records.len(),
        blank: conversion.blank,
        missing_word: conversion.missing_word,
        output: config.output.clone(),
        bytes,
    })
}
