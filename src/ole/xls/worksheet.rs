//! Worksheet implementation for XLS files

use std::collections::BTreeMap;

use crate::ole::xls::cell::CellValue;

static EMPTY: CellValue = CellValue::Empty;

/// A parsed worksheet
///
/// Cells are stored sparsely; positions never written read back as
/// [`CellValue::Empty`]. The row and column counts cover both the DIMENSIONS
/// record and every cell actually seen, whichever reaches further.
#[derive(Debug, Clone)]
pub struct XlsWorksheet {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
    rows: u32,
    cols: u32,
}

impl XlsWorksheet {
    /// Create a new worksheet
    pub fn new(name: impl Into<String>) -> Self {
        XlsWorksheet {
            name: name.into(),
            cells: BTreeMap::new(),
            rows: 0,
            cols: 0,
        }
    }

    /// Widen the used range to at least `rows` x `cols`
    pub fn extend_dimensions(&mut self, rows: u32, cols: u32) {
        self.rows = self.rows.max(rows);
        self.cols = self.cols.max(cols);
    }

    /// Store a cell value, widening the used range to include it
    pub fn set(&mut self, row: u32, col: u32, value: CellValue) {
        self.extend_dimensions(row.saturating_add(1), col.saturating_add(1));
        if value == CellValue::Empty {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows as usize
    }

    pub fn column_count(&self) -> usize {
        self.cols as usize
    }

    /// Value at a position, `Empty` when nothing was stored there
    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    /// All values of a row, padded with `Empty` to the column count
    ///
    /// Returns `None` past the last row.
    pub fn row_values(&self, row: usize) -> Option<Vec<CellValue>> {
        if row >= self.row_count() {
            return None;
        }
        let row = row as u32;
        Some((0..self.cols).map(|col| self.cell(row, col).clone()).collect())
    }

    /// Iterate rows in order, header included
    pub fn rows(&self) -> impl Iterator<Item = Vec<CellValue>> + '_ {
        (0..self.row_count()).filter_map(|row| self.row_values(row))
    }
}
