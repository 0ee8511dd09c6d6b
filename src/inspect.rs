//! Human-readable sheet preview.
//!
//! Used to check which columns hold which fields before converting a new
//! export of the word list.
use std::fmt;

use crate::ole::xls::{XlsWorksheet, trim_space};

const RULE_WIDTH: usize = 70;
/// Characters of each cell shown in the data row listing
const PREVIEW_CHARS: usize = 51;

/// Describe `sheet`: dimensions, indexed header, and up to `limit` data rows
///
/// Rows are numbered from 1, as spreadsheet applications show them. Data rows
/// list only their non-blank cells.
pub fn describe(sheet: &XlsWorksheet, limit: usize) -> String {
    Description { sheet, limit }.to_string()
}

struct Description<'a> {
    sheet: &'a XlsWorksheet,
    limit: usize,
}

impl fmt::Display for Description<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_description(out, self.sheet, self.limit)
    }
}

fn write_description(out: &mut fmt::Formatter<'_>, sheet: &XlsWorksheet, limit: usize) -> fmt::Result {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    writeln!(out, "Sheet '{}'", sheet.name())?;
    writeln!(out, "{heavy}")?;
    writeln!(
        out,
        "Dimensions: {} rows x {} columns",
        sheet.row_count(),
        sheet.column_count()
    )?;
    writeln!(out)?;

    let Some(header) = sheet.row_values(0) else {
        return writeln!(out, "(empty sheet)");
    };

    writeln!(out, "Header row (row 1):")?;
    writeln!(out, "{light}")?;
    for (index, value) in header.iter().enumerate() {
        writeln!(out, "  Column {index}: {:?}", value.to_string())?;
    }
    writeln!(out)?;

    writeln!(out, "First {limit} data rows with column indices:")?;
    writeln!(out, "{light}")?;
    for (index, row) in sheet.rows().enumerate().skip(1).take(limit) {
        writeln!(out, "Row {}:", index + 1)?;
        for (column, value) in row.iter().enumerate() {
            let text = value.to_string();
            let text = trim_space(&text);
            if text.is_empty() {
                continue;
            }
            let preview: String = text.chars().take(PREVIEW_CHARS).collect();
            writeln!(out, "  [{column}] {preview}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
