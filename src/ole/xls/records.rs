//! BIFF record parsing for XLS files
//!
//! A workbook stream is a flat sequence of records, each a 4-byte header
//! (type, length) followed by its body. Bodies are capped at 8224 bytes; longer
//! payloads such as the shared string table spill into CONTINUE records, which
//! the iterator folds back into their owner while remembering where each one
//! started.

use encoding_rs::Encoding;

use crate::binary;
use crate::ole::xls::cell::decode_rk;
use crate::ole::xls::error::{XlsError, XlsResult};
use crate::ole::xls::strings::{self, LenWidth};

/// Record type identifiers
pub mod rt {
    pub const FORMULA: u16 = 0x0006;
    pub const EOF: u16 = 0x000A;
    pub const FILEPASS: u16 = 0x002F;
    pub const CONTINUE: u16 = 0x003C;
    pub const CODEPAGE: u16 = 0x0042;
    pub const BOUNDSHEET: u16 = 0x0085;
    pub const MULRK: u16 = 0x00BD;
    pub const MULBLANK: u16 = 0x00BE;
    pub const RSTRING: u16 = 0x00D6;
    pub const SST: u16 = 0x00FC;
    pub const LABELSST: u16 = 0x00FD;
    pub const DIMENSIONS: u16 = 0x0200;
    pub const BLANK: u16 = 0x0201;
    pub const NUMBER: u16 = 0x0203;
    pub const LABEL: u16 = 0x0204;
    pub const BOOLERR: u16 = 0x0205;
    pub const STRING: u16 = 0x0207;
    pub const RK: u16 = 0x027E;
    pub const BOF: u16 = 0x0809;
}

/// A BIFF record with any CONTINUE bodies appended
#[derive(Debug, Clone)]
pub struct Record {
    pub record_type: u16,
    /// Offset of the record header within the stream
    pub offset: usize,
    pub data: Vec<u8>,
    /// Offsets into `data` where each CONTINUE body begins
    pub continues: Vec<usize>,
}

impl Record {
    /// Fail with `InvalidLength` unless the body holds at least `expected` bytes
    pub fn require(&self, expected: usize) -> XlsResult<()> {
        if self.data.len() < expected {
            return Err(XlsError::InvalidLength {
                record_type: self.record_type,
                expected,
                found: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Iterator over BIFF records in a workbook stream
pub struct RecordIter<'a> {
    stream: &'a [u8],
    pos: usize,
}

impl<'a> RecordIter<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        RecordIter { stream, pos: 0 }
    }

    /// Seek to an absolute stream offset, as BOUNDSHEET positions require
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.stream.len());
    }

    fn header_at(&self, pos: usize) -> Option<(u16, usize)> {
        let record_type = binary::read_u16_le(self.stream, pos).ok()?;
        let len = binary::read_u16_le(self.stream, pos + 2).ok()?;
        Some((record_type, usize::from(len)))
    }

    fn read_record(&mut self) -> XlsResult<Record> {
        let offset = self.pos;
        let (record_type, len) = self.header_at(offset).ok_or(XlsError::Truncated {
            record_type: 0,
            offset,
        })?;

        let body = binary::read_slice(self.stream, offset + 4, len)
            .map_err(|_| XlsError::Truncated { record_type, offset })?;
        let mut record = Record {
            record_type,
            offset,
            data: body.to_vec(),
            continues: Vec::new(),
        };
        self.pos = offset + 4 + len;

        while let Some((rt::CONTINUE, len)) = self.header_at(self.pos) {
            let body = binary::read_slice(self.stream, self.pos + 4, len).map_err(|_| {
                XlsError::Truncated {
                    record_type: rt::CONTINUE,
                    offset: self.pos,
                }
            })?;
            record.continues.push(record.data.len());
            record.data.extend_from_slice(body);
            self.pos += 4 + len;
        }

        Ok(record)
    }
}

impl Iterator for RecordIter<'_> {
    type Item = XlsResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.stream.len() {
            return None;
        }
        let result = self.read_record();
        if result.is_err() {
            // A truncated record ends the stream; don't spin on it.
            self.pos = self.stream.len();
        }
        Some(result)
    }
}

/// BIFF versions stored in OLE containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiffVersion {
    /// Excel 5.0 / 95: 8-bit strings in the workbook codepage
    Biff5,
    /// Excel 97-2003: Unicode strings and a shared string table
    Biff8,
}

/// BOF (Beginning of File) record
#[derive(Debug, Clone)]
pub struct BofRecord {
    pub version: BiffVersion,
    /// Substream type (0x0005 globals, 0x0010 worksheet, ...)
    pub substream: u16,
}

impl BofRecord {
    pub fn parse(record: &Record) -> XlsResult<Self> {
        if record.record_type != rt::BOF {
            return Err(XlsError::MissingBof(record.record_type));
        }
        record.require(4)?;

        let raw_version = binary::read_u16_le(&record.data, 0)?;
        let version = match raw_version {
            0x0600 => BiffVersion::Biff8,
            0x0500 => BiffVersion::Biff5,
            other => return Err(XlsError::UnsupportedBiffVersion(other)),
        };

        Ok(BofRecord {
            version,
            substream: binary::read_u16_le(&record.data, 2)?,
        })
    }
}

/// Sheet types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetType {
    WorkSheet,
    MacroSheet,
    ChartSheet,
    VbModule,
    Other(u8),
}

impl From<u8> for SheetType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SheetType::WorkSheet,
            0x01 => SheetType::MacroSheet,
            0x02 => SheetType::ChartSheet,
            0x06 => SheetType::VbModule,
            v => SheetType::Other(v),
        }
    }
}

/// BOUNDSHEET record (sheet name and substream position)
#[derive(Debug, Clone)]
pub struct BoundSheetRecord {
    /// Stream offset of the sheet's BOF record
    pub position: u32,
    pub sheet_type: SheetType,
    pub name: String,
}

impl BoundSheetRecord {
    pub fn parse(
        record: &Record,
        version: BiffVersion,
        encoding: &'static Encoding,
    ) -> XlsResult<Self> {
        record.require(7)?;
        let data = &record.data;

        let position = binary::read_u32_le(data, 0)?;
        let sheet_type = SheetType::from(data[5]);
        let (name, _) = match version {
            BiffVersion::Biff8 => strings::unicode_string(data, 6, LenWidth::U8)?,
            BiffVersion::Biff5 => strings::byte_string(data, 6, LenWidth::U8, encoding)?,
        };

        Ok(BoundSheetRecord {
            position,
            sheet_type,
            name,
        })
    }
}

/// DIMENSIONS record (used range of a worksheet)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionsRecord {
    pub first_row: u32,
    /// One past the last used row
    pub last_row: u32,
    pub first_col: u32,
    /// One past the last used column
    pub last_col: u32,
}

impl DimensionsRecord {
    pub fn parse(record: &Record) -> XlsResult<Self> {
        let data = &record.data;
        if data.len() >= 14 {
            // BIFF8 with 32-bit row indices
            Ok(DimensionsRecord {
                first_row: binary::read_u32_le(data, 0)?,
                last_row: binary::read_u32_le(data, 4)?,
                first_col: u32::from(binary::read_u16_le(data, 8)?),
                last_col: u32::from(binary::read_u16_le(data, 10)?),
            })
        } else {
            record.require(10)?;
            Ok(DimensionsRecord {
                first_row: u32::from(binary::read_u16_le(data, 0)?),
                last_row: u32::from(binary::read_u16_le(data, 2)?),
                first_col: u32::from(binary::read_u16_le(data, 4)?),
                last_col: u32::from(binary::read_u16_le(data, 6)?),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoolErrValue {
    Bool(bool),
    Error(u8),
}

/// Cached result of a FORMULA record
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    /// The text result follows in a STRING record
    PendingString,
    EmptyString,
    Bool(bool),
    Error(u8),
}

/// Cell-bearing records
#[derive(Debug, Clone, PartialEq)]
pub enum CellRecord {
    Blank {
        row: u32,
        col: u32,
    },
    MulBlank {
        row: u32,
        first_col: u32,
        last_col: u32,
    },
    Number {
        row: u32,
        col: u32,
        value: f64,
    },
    Rk {
        row: u32,
        col: u32,
        value: f64,
    },
    MulRk {
        row: u32,
        first_col: u32,
        values: Vec<f64>,
    },
    Label {
        row: u32,
        col: u32,
        value: String,
    },
    LabelSst {
        row: u32,
        col: u32,
        sst_index: u32,
    },
    BoolErr {
        row: u32,
        col: u32,
        value: BoolErrValue,
    },
    Formula {
        row: u32,
        col: u32,
        value: FormulaValue,
    },
    /// Text result of the preceding FORMULA record
    StringResult(String),
}

impl CellRecord {
    /// Parse a cell record; other record types yield `None`
    pub fn parse(
        record: &Record,
        version: BiffVersion,
        encoding: &'static Encoding,
    ) -> XlsResult<Option<Self>> {
        let cell = match record.record_type {
            rt::BLANK => Self::parse_blank(record)?,
            rt::MULBLANK => Self::parse_mul_blank(record)?,
            rt::NUMBER => Self::parse_number(record)?,
            rt::RK => Self::parse_rk(record)?,
            rt::MULRK => Self::parse_mul_rk(record)?,
            rt::LABEL | rt::RSTRING => Self::parse_label(record, version, encoding)?,
            rt::LABELSST => Self::parse_label_sst(record)?,
            rt::BOOLERR => Self::parse_bool_err(record)?,
            rt::FORMULA => Self::parse_formula(record)?,
            rt::STRING => Self::parse_string(record, version, encoding)?,
            _ => return Ok(None),
        };
        Ok(Some(cell))
    }

    fn position(record: &Record) -> XlsResult<(u32, u32)> {
        let row = binary::read_u16_le(&record.data, 0)?;
        let col = binary::read_u16_le(&record.data, 2)?;
        Ok((u32::from(row), u32::from(col)))
    }

    fn parse_blank(record: &Record) -> XlsResult<Self> {
        record.require(6)?;
        let (row, col) = Self::position(record)?;
        Ok(CellRecord::Blank { row, col })
    }

    fn parse_mul_blank(record: &Record) -> XlsResult<Self> {
        record.require(8)?;
        let (row, first_col) = Self::position(record)?;
        let last_col = u32::from(binary::read_u16_le(&record.data, record.data.len() - 2)?);
        Ok(CellRecord::MulBlank {
            row,
            first_col,
            last_col,
        })
    }

    fn parse_number(record: &Record) -> XlsResult<Self> {
        record.require(14)?;
        let (row, col) = Self::position(record)?;
        Ok(CellRecord::Number {
            row,
            col,
            value: binary::read_f64_le(&record.data, 6)?,
        })
    }

    fn parse_rk(record: &Record) -> XlsResult<Self> {
        record.require(10)?;
        let (row, col) = Self::position(record)?;
        Ok(CellRecord::Rk {
            row,
            col,
            value: decode_rk(binary::read_u32_le(&record.data, 6)?),
        })
    }

    fn parse_mul_rk(record: &Record) -> XlsResult<Self> {
        // row, first col, n * (xf, rk), last col
        record.require(12)?;
        let (row, first_col) = Self::position(record)?;
        let count = (record.data.len() - 6) / 6;
        let values = (0..count)
            .map(|i| binary::read_u32_le(&record.data, 4 + i * 6 + 2).map(decode_rk))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CellRecord::MulRk {
            row,
            first_col,
            values,
        })
    }

    fn parse_label(
        record: &Record,
        version: BiffVersion,
        encoding: &'static Encoding,
    ) -> XlsResult<Self> {
        record.require(8)?;
        let (row, col) = Self::position(record)?;
        let (value, _) = match version {
            BiffVersion::Biff8 => strings::unicode_string(&record.data, 6, LenWidth::U16)?,
            BiffVersion::Biff5 => {
                strings::byte_string(&record.data, 6, LenWidth::U16, encoding)?
            },
        };
        Ok(CellRecord::Label { row, col, value })
    }

    fn parse_label_sst(record: &Record) -> XlsResult<Self> {
        record.require(10)?;
        let (row, col) = Self::position(record)?;
        Ok(CellRecord::LabelSst {
            row,
            col,
            sst_index: binary::read_u32_le(&record.data, 6)?,
        })
    }

    fn parse_bool_err(record: &Record) -> XlsResult<Self> {
        record.require(8)?;
        let (row, col) = Self::position(record)?;
        let raw = record.data[6];
        let value = if record.data[7] == 0 {
            BoolErrValue::Bool(raw != 0)
        } else {
            BoolErrValue::Error(raw)
        };
        Ok(CellRecord::BoolErr { row, col, value })
    }

    fn parse_formula(record: &Record) -> XlsResult<Self> {
        record.require(20)?;
        let (row, col) = Self::position(record)?;
        let result = &record.data[6..14];

        // A non-numeric result is flagged by 0xFFFF in the top two bytes
        let value = if result[6] == 0xFF && result[7] == 0xFF {
            match result[0] {
                0x00 => FormulaValue::PendingString,
                0x01 => FormulaValue::Bool(result[2] != 0),
                0x02 => FormulaValue::Error(result[2]),
                _ => FormulaValue::EmptyString,
            }
        } else {
            FormulaValue::Number(binary::read_f64_le(result, 0)?)
        };

        Ok(CellRecord::Formula { row, col, value })
    }

    fn parse_string(
        record: &Record,
        version: BiffVersion,
        encoding: &'static Encoding,
    ) -> XlsResult<Self> {
        let (value, _) = match version {
            BiffVersion::Biff8 => strings::unicode_string(&record.data, 0, LenWidth::U16)?,
            BiffVersion::Biff5 => strings::byte_string(&record.data, 0, LenWidth::U16, encoding)?,
        };
        Ok(CellRecord::StringResult(value))
    }
}
