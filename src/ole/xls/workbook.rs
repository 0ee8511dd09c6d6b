//! Workbook implementation for XLS files

use std::io::Cursor;
use std::path::Path;

use encoding_rs::Encoding;
use tracing::debug;

use crate::binary;
use crate::error::{Error, Result};
use crate::ole::OleFile;
use crate::ole::codepage::codepage_to_encoding;
use crate::ole::xls::cell::CellValue;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::records::{
    BiffVersion, BofRecord, BoolErrValue, BoundSheetRecord, CellRecord, DimensionsRecord,
    FormulaValue, RecordIter, SheetType, rt,
};
use crate::ole::xls::strings;
use crate::ole::xls::worksheet::XlsWorksheet;

/// An XLS workbook held in memory
///
/// Only the globals substream is parsed up front; each worksheet substream is
/// decoded when it is requested.
#[derive(Debug)]
pub struct XlsWorkbook {
    stream: Vec<u8>,
    version: BiffVersion,
    encoding: &'static Encoding,
    declared_codepage: Option<u16>,
    sheets: Vec<BoundSheetRecord>,
    shared_strings: Vec<String>,
}

impl XlsWorkbook {
    /// Read and parse an `.xls` file
    ///
    /// `encoding` decodes every 8-bit string in the file, whatever its
    /// CODEPAGE record claims.
    pub fn open(path: impl AsRef<Path>, encoding: &'static Encoding) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::FileAccess {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data, encoding).map_err(|source| Error::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse an `.xls` file already in memory
    pub fn from_bytes(data: Vec<u8>, encoding: &'static Encoding) -> XlsResult<Self> {
        let mut ole = OleFile::open(Cursor::new(data))?;

        let stream = if ole.exists(&["Workbook"]) {
            ole.open_stream(&["Workbook"])?
        } else if ole.exists(&["Book"]) {
            ole.open_stream(&["Book"])?
        } else {
            return Err(XlsError::MissingWorkbookStream);
        };
        debug!(bytes = stream.len(), "loaded workbook stream");

        let mut workbook = XlsWorkbook {
            stream,
            version: BiffVersion::Biff8,
            encoding,
            declared_codepage: None,
            sheets: Vec::new(),
            shared_strings: Vec::new(),
        };
        workbook.parse_globals()?;
        Ok(workbook)
    }

    fn parse_globals(&mut self) -> XlsResult<()> {
        let mut records = RecordIter::new(&self.stream);

        let first = records.next().ok_or(XlsError::MissingBof(0))??;
        self.version = BofRecord::parse(&first)?.version;
        debug!(version = ?self.version, "workbook globals");

        for record in records {
            let record = record?;
            match record.record_type {
                rt::FILEPASS => return Err(XlsError::PasswordProtected),
                rt::CODEPAGE => {
                    let codepage = binary::read_u16_le(&record.data, 0)?;
                    self.declared_codepage = Some(codepage);
                    self.log_codepage(codepage);
                },
                rt::BOUNDSHEET => {
                    let sheet = BoundSheetRecord::parse(&record, self.version, self.encoding)?;
                    debug!(name = %sheet.name, position = sheet.position, kind = ?sheet.sheet_type, "sheet");
                    self.sheets.push(sheet);
                },
                rt::SST => {
                    self.shared_strings = strings::parse_sst(&record)?;
                    debug!(count = self.shared_strings.len(), "shared strings");
                },
                rt::EOF => break,
                _ => {},
            }
        }

        Ok(())
    }

    fn log_codepage(&self, codepage: u16) {
        // BIFF8 text is Unicode, so the declared codepage only matters for BIFF5
        let declared = codepage_to_encoding(u32::from(codepage)).map(Encoding::name);
        debug!(
            codepage,
            declared = declared.unwrap_or("unknown"),
            using = self.encoding.name(),
            "CODEPAGE record"
        );
    }

    pub fn biff_version(&self) -> BiffVersion {
        self.version
    }

    /// Codepage named by the file's CODEPAGE record, if any
    pub fn declared_codepage(&self) -> Option<u16> {
        self.declared_codepage
    }

    fn worksheets(&self) -> impl Iterator<Item = &BoundSheetRecord> {
        self.sheets
            .iter()
            .filter(|sheet| sheet.sheet_type == SheetType::WorkSheet)
    }

    /// Names of the worksheets in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets().map(|sheet| sheet.name.as_str()).collect()
    }

    pub fn worksheet_count(&self) -> usize {
        self.worksheets().count()
    }

    /// Decode the worksheet at `index`
    pub fn worksheet(&self, index: usize) -> XlsResult<XlsWorksheet> {
        let bound = self
            .worksheets()
            .nth(index)
            .ok_or_else(|| XlsError::WorksheetNotFound {
                index,
                count: self.worksheet_count(),
            })?;

        let start = bound.position as usize;
        if start >= self.stream.len() {
            return Err(XlsError::InvalidSheetOffset {
                name: bound.name.clone(),
                offset: bound.position,
            });
        }

        let mut records = RecordIter::new(&self.stream);
        records.seek(start);
        let first = records.next().ok_or(XlsError::MissingBof(0))??;
        BofRecord::parse(&first)?;

        let mut sheet = XlsWorksheet::new(bound.name.clone());
        let mut pending_string: Option<(u32, u32)> = None;

        for record in records {
            let record = record?;
            match record.record_type {
                rt::EOF => break,
                rt::DIMENSIONS => {
                    let dims = DimensionsRecord::parse(&record)?;
                    sheet.extend_dimensions(dims.last_row, dims.last_col);
                },
                _ => {
                    if let Some(cell) = CellRecord::parse(&record, self.version, self.encoding)? {
                        self.apply(&mut sheet, cell, &mut pending_string)?;
                    }
                },
            }
        }

        debug!(
            name = sheet.name(),
            rows = sheet.row_count(),
            columns = sheet.column_count(),
            "parsed worksheet"
        );
        Ok(sheet)
    }

    fn apply(
        &self,
        sheet: &mut XlsWorksheet,
        cell: CellRecord,
        pending_string: &mut Option<(u32, u32)>,
    ) -> XlsResult<()> {
        match cell {
            CellRecord::Blank { row, col } => sheet.set(row, col, CellValue::Empty),
            CellRecord::MulBlank {
                row,
                first_col,
                last_col,
            } => {
                for col in first_col..=last_col {
                    sheet.set(row, col, CellValue::Empty);
                }
            },
            CellRecord::Number { row, col, value } | CellRecord::Rk { row, col, value } => {
                sheet.set(row, col, CellValue::Number(value));
            },
            CellRecord::MulRk {
                row,
                first_col,
                values,
            } => {
                for (col, value) in (first_col..).zip(values) {
                    sheet.set(row, col, CellValue::Number(value));
                }
            },
            CellRecord::Label { row, col, value } => sheet.set(row, col, CellValue::Text(value)),
            CellRecord::LabelSst {
                row,
                col,
                sst_index,
            } => {
                let text = self
                    .shared_strings
                    .get(sst_index as usize)
                    .ok_or(XlsError::InvalidSstIndex {
                        index: sst_index,
                        len: self.shared_strings.len(),
                    })?;
                sheet.set(row, col, CellValue::Text(text.clone()));
            },
            CellRecord::BoolErr { row, col, value } => {
                let value = match value {
                    BoolErrValue::Bool(b) => CellValue::Bool(b),
                    BoolErrValue::Error(code) => CellValue::Error(code),
                };
                sheet.set(row, col, value);
            },
            CellRecord::Formula { row, col, value } => {
                let value = match value {
                    FormulaValue::Number(n) => CellValue::Number(n),
                    FormulaValue::EmptyString => CellValue::Text(String::new()),
                    FormulaValue::Bool(b) => CellValue::Bool(b),
                    FormulaValue::Error(code) => CellValue::Error(code),
                    FormulaValue::PendingString => {
                        *pending_string = Some((row, col));
                        CellValue::Text(String::new())
                    },
                };
                sheet.set(row, col, value);
            },
            CellRecord::StringResult(text) => {
                if let Some((row, col)) = pending_string.take() {
                    sheet.set(row, col, CellValue::Text(text));
                }
            },
        }
        Ok(())
    }
}
