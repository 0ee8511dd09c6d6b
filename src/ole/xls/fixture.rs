//! In-memory `.xls` builders for tests
//!
//! Produces a minimal but well-formed OLE2 container around a BIFF5 or BIFF8
//! workbook stream, so readers can be exercised without binary fixtures.

use std::collections::HashSet;
use std::path::Path;

use encoding_rs::Encoding;

use crate::ole::consts::*;
use crate::ole::xls::records::{BiffVersion, rt};

const SECTOR_SIZE: usize = 512;
const MIN_STREAM_SIZE: usize = 4096;
const MAX_RECORD_LEN: usize = 8224;

/// Wrap `stream` in an OLE2 container as the only stream under the root
///
/// Streams shorter than the mini stream cutoff are zero-padded so they are
/// always stored in regular sectors.
pub(crate) fn ole_container(name: &str, stream: &[u8]) -> Vec<u8> {
    let mut payload = stream.to_vec();
    if payload.len() < MIN_STREAM_SIZE {
        payload.resize(MIN_STREAM_SIZE, 0);
    }

    let data_sectors = payload.len().div_ceil(SECTOR_SIZE);
    let entries_per_fat = SECTOR_SIZE / 4;
    let mut fat_sectors = 1;
    while fat_sectors * entries_per_fat < fat_sectors + 1 + data_sectors {
        fat_sectors += 1;
    }
    assert!(fat_sectors <= HEADER_DIFAT_ENTRIES, "fixture stream too large");

    let dir_sector = fat_sectors as u32;
    let first_data = dir_sector + 1;

    let mut out = Vec::new();

    // Header
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[0u8; 16]);
    out.extend_from_slice(&0x003Eu16.to_le_bytes());
    out.extend_from_slice(&3u16.to_le_bytes());
    out.extend_from_slice(&0xFFFEu16.to_le_bytes());
    out.extend_from_slice(&9u16.to_le_bytes());
    out.extend_from_slice(&6u16.to_le_bytes());
    out.extend_from_slice(&[0u8; 6]);
    out.extend_from_slice(&0u32.to_le_bytes()); // directory sectors (v3: 0)
    out.extend_from_slice(&(fat_sectors as u32).to_le_bytes());
    out.extend_from_slice(&dir_sector.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(MIN_STREAM_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&ENDOFCHAIN.to_le_bytes()); // minifat
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&ENDOFCHAIN.to_le_bytes()); // difat
    out.extend_from_slice(&0u32.to_le_bytes());
    for i in 0..HEADER_DIFAT_ENTRIES {
        let id = if i < fat_sectors { i as u32 } else { FREESECT };
        out.extend_from_slice(&id.to_le_bytes());
    }
    debug_assert_eq!(out.len(), HEADER_SIZE);

    // FAT
    let mut fat = vec![FREESECT; fat_sectors * entries_per_fat];
    fat[..fat_sectors].fill(FATSECT);
    fat[dir_sector as usize] = ENDOFCHAIN;
    for i in 0..data_sectors {
        let sector = first_data as usize + i;
        fat[sector] = if i + 1 == data_sectors {
            ENDOFCHAIN
        } else {
            sector as u32 + 1
        };
    }
    for id in fat {
        out.extend_from_slice(&id.to_le_bytes());
    }

    // Directory: root, the stream, two unused slots
    out.extend(dir_entry("Root Entry", STGTY_ROOT, 1, ENDOFCHAIN, 0));
    out.extend(dir_entry(
        name,
        STGTY_STREAM,
        NOSTREAM,
        first_data,
        payload.len() as u32,
    ));
    out.extend(dir_entry("", STGTY_EMPTY, NOSTREAM, 0, 0));
    out.extend(dir_entry("", STGTY_EMPTY, NOSTREAM, 0, 0));

    out.extend_from_slice(&payload);
    out.resize(HEADER_SIZE + (first_data as usize + data_sectors) * SECTOR_SIZE, 0);
    out
}

fn dir_entry(name: &str, entry_type: u8, child: u32, start: u32, size: u32) -> Vec<u8> {
    let mut entry = vec![0u8; DIRENTRY_SIZE];
    let units: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in units.iter().enumerate() {
        entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    let name_len = if units.is_empty() { 0 } else { (units.len() + 1) * 2 };
    entry[64..66].copy_from_slice(&(name_len as u16).to_le_bytes());
    entry[66] = entry_type;
    entry[67] = 1; // black
    entry[68..72].copy_from_slice(&NOSTREAM.to_le_bytes());
    entry[72..76].copy_from_slice(&NOSTREAM.to_le_bytes());
    entry[76..80].copy_from_slice(&child.to_le_bytes());
    entry[116..120].copy_from_slice(&start.to_le_bytes());
    entry[120..124].copy_from_slice(&size.to_le_bytes());
    entry
}

/// A cell to write into a fixture sheet
#[derive(Debug, Clone)]
pub(crate) enum Cell {
    Text(String),
    Number(f64),
    /// Integer stored as an RK record
    Rk(i32),
    Bool(bool),
    Error(u8),
    /// Formula whose cached result is text, followed by a STRING record
    FormulaText(String),
    /// BLANK record (formatting only)
    Blank,
    /// No record at all
    Missing,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(value.to_string())
        }
    }
}

/// Rows of text cells; empty strings leave the cell out
pub(crate) fn text_rows(rows: &[&[&str]]) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|row| row.iter().map(|&value| Cell::from(value)).collect())
        .collect()
}

/// Builder for a BIFF workbook stream and its OLE container
#[derive(Debug, Clone)]
pub(crate) struct WorkbookFixture {
    version: BiffVersion,
    sheets: Vec<(String, Vec<Vec<Cell>>, u8)>,
    max_record_len: usize,
    label_encoding: &'static Encoding,
    codepage: Option<u16>,
    inline_labels: bool,
}

impl WorkbookFixture {
    pub(crate) fn biff8() -> Self {
        Self::new(BiffVersion::Biff8)
    }

    pub(crate) fn biff5() -> Self {
        Self::new(BiffVersion::Biff5)
    }

    fn new(version: BiffVersion) -> Self {
        WorkbookFixture {
            version,
            sheets: Vec::new(),
            max_record_len: MAX_RECORD_LEN,
            label_encoding: encoding_rs::WINDOWS_1252,
            codepage: None,
            inline_labels: false,
        }
    }

    pub(crate) fn sheet(mut self, name: &str, rows: Vec<Vec<Cell>>) -> Self {
        self.sheets.push((name.to_string(), rows, 0x00));
        self
    }

    /// Add a chart sheet entry, which readers must skip over
    pub(crate) fn chart_sheet(mut self, name: &str) -> Self {
        self.sheets.push((name.to_string(), Vec::new(), 0x02));
        self
    }

    /// Cap SST record bodies so strings spill into CONTINUE records
    pub(crate) fn max_record_len(mut self, len: usize) -> Self {
        self.max_record_len = len;
        self
    }

    /// Encoding used for BIFF5 byte strings
    pub(crate) fn label_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.label_encoding = encoding;
        self
    }

    /// Emit a CODEPAGE record
    pub(crate) fn codepage(mut self, codepage: u16) -> Self {
        self.codepage = Some(codepage);
        self
    }

    /// Write BIFF8 text as LABEL records instead of LABELSST
    pub(crate) fn inline_labels(mut self) -> Self {
        self.inline_labels = true;
        self
    }

    fn uses_sst(&self) -> bool {
        self.version == BiffVersion::Biff8 && !self.inline_labels
    }

    /// The raw workbook stream
    pub(crate) fn stream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        record(&mut out, rt::BOF, &self.bof(0x0005));
        if let Some(codepage) = self.codepage {
            record(&mut out, rt::CODEPAGE, &codepage.to_le_bytes());
        }

        let mut position_slots = Vec::new();
        for (name, _, sheet_type) in &self.sheets {
            let mut body = vec![0u8; 4];
            body.push(0x00);
            body.push(*sheet_type);
            body.extend(self.short_string(name));
            position_slots.push(out.len() + 4);
            record(&mut out, rt::BOUNDSHEET, &body);
        }

        let sst = self.shared_strings();
        if self.uses_sst() {
            self.write_sst(&mut out, &sst);
        }
        record(&mut out, rt::EOF, &[]);

        for ((_, rows, _), slot) in self.sheets.iter().zip(position_slots) {
            let position = out.len() as u32;
            out[slot..slot + 4].copy_from_slice(&position.to_le_bytes());
            self.write_sheet(&mut out, rows, &sst);
        }

        out
    }

    /// The complete `.xls` file
    pub(crate) fn build(&self) -> Vec<u8> {
        let name = match self.version {
            BiffVersion::Biff8 => "Workbook",
            BiffVersion::Biff5 => "Book",
        };
        ole_container(name, &self.stream())
    }

    pub(crate) fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write fixture");
    }

    fn bof(&self, substream: u16) -> Vec<u8> {
        let mut body = Vec::new();
        let version: u16 = match self.version {
            BiffVersion::Biff8 => 0x0600,
            BiffVersion::Biff5 => 0x0500,
        };
        body.extend_from_slice(&version.to_le_bytes());
        body.extend_from_slice(&substream.to_le_bytes());
        body.extend_from_slice(&0x0DBBu16.to_le_bytes());
        body.extend_from_slice(&0x07CCu16.to_le_bytes());
        if self.version == BiffVersion::Biff8 {
            body.extend_from_slice(&[0u8; 8]);
        }
        body
    }

    fn encode(&self, text: &str) -> Vec<u8> {
        self.label_encoding.encode(text).0.into_owned()
    }

    /// Sheet name with an 8-bit length
    fn short_string(&self, text: &str) -> Vec<u8> {
        match self.version {
            BiffVersion::Biff8 => {
                let (flags, chars, units) = unicode_chars(text);
                let mut out = vec![units as u8, flags];
                out.extend(chars);
                out
            },
            BiffVersion::Biff5 => {
                let bytes = self.encode(text);
                let mut out = vec![bytes.len() as u8];
                out.extend(bytes);
                out
            },
        }
    }

    /// Cell text with a 16-bit length
    fn long_string(&self, text: &str) -> Vec<u8> {
        match self.version {
            BiffVersion::Biff8 => {
                let (flags, chars, units) = unicode_chars(text);
                let mut out = (units as u16).to_le_bytes().to_vec();
                out.push(flags);
                out.extend(chars);
                out
            },
            BiffVersion::Biff5 => {
                let bytes = self.encode(text);
                let mut out = (bytes.len() as u16).to_le_bytes().to_vec();
                out.extend(bytes);
                out
            },
        }
    }

    fn shared_strings(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut strings = Vec::new();
        for (_, rows, _) in &self.sheets {
            for cell in rows.iter().flatten() {
                if let Cell::Text(text) = cell {
                    if seen.insert(text.as_str()) {
                        strings.push(text.clone());
                    }
                }
            }
        }
        strings
    }

    fn write_sst(&self, out: &mut Vec<u8>, strings: &[String]) {
        let max = self.max_record_len;
        let total: usize = self
            .sheets
            .iter()
            .flat_map(|(_, rows, _)| rows.iter().flatten())
            .filter(|cell| matches!(cell, Cell::Text(_)))
            .count();

        let mut bodies: Vec<Vec<u8>> = Vec::new();
        let mut cur = Vec::new();
        cur.extend_from_slice(&(total as u32).to_le_bytes());
        cur.extend_from_slice(&(strings.len() as u32).to_le_bytes());

        for text in strings {
            let units: Vec<u16> = text.encode_utf16().collect();
            let high = units.iter().any(|&u| u > 0xFF);
            let width = if high { 2 } else { 1 };
            let flags = u8::from(high);

            let first_char = if units.is_empty() { 0 } else { width };
            if cur.len() + 3 + first_char > max {
                bodies.push(std::mem::take(&mut cur));
            }
            cur.extend_from_slice(&(units.len() as u16).to_le_bytes());
            cur.push(flags);

            let mut idx = 0;
            while idx < units.len() {
                let room = max.saturating_sub(cur.len()) / width;
                if room == 0 {
                    bodies.push(std::mem::take(&mut cur));
                    cur.push(flags);
                    continue;
                }
                let take = room.min(units.len() - idx);
                for &unit in &units[idx..idx + take] {
                    if high {
                        cur.extend_from_slice(&unit.to_le_bytes());
                    } else {
                        cur.push(unit as u8);
                    }
                }
                idx += take;
            }
        }
        bodies.push(cur);

        for (i, body) in bodies.iter().enumerate() {
            let record_type = if i == 0 { rt::SST } else { rt::CONTINUE };
            record(out, record_type, body);
        }
    }

    fn write_sheet(&self, out: &mut Vec<u8>, rows: &[Vec<Cell>], sst: &[String]) {
        record(out, rt::BOF, &self.bof(0x0010));

        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut dims = Vec::new();
        match self.version {
            BiffVersion::Biff8 => {
                dims.extend_from_slice(&0u32.to_le_bytes());
                dims.extend_from_slice(&(rows.len() as u32).to_le_bytes());
            },
            BiffVersion::Biff5 => {
                dims.extend_from_slice(&0u16.to_le_bytes());
                dims.extend_from_slice(&(rows.len() as u16).to_le_bytes());
            },
        }
        dims.extend_from_slice(&0u16.to_le_bytes());
        dims.extend_from_slice(&(cols as u16).to_le_bytes());
        dims.extend_from_slice(&0u16.to_le_bytes());
        record(out, rt::DIMENSIONS, &dims);

        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let mut body = Vec::new();
                body.extend_from_slice(&(r as u16).to_le_bytes());
                body.extend_from_slice(&(c as u16).to_le_bytes());
                body.extend_from_slice(&0x0Fu16.to_le_bytes());

                match cell {
                    Cell::Missing => continue,
                    Cell::Blank => record(out, rt::BLANK, &body),
                    Cell::Number(n) => {
                        body.extend_from_slice(&n.to_le_bytes());
                        record(out, rt::NUMBER, &body);
                    },
                    Cell::Rk(n) => {
                        body.extend_from_slice(&(((*n << 2) | 0x02) as u32).to_le_bytes());
                        record(out, rt::RK, &body);
                    },
                    Cell::Bool(b) => {
                        body.extend_from_slice(&[u8::from(*b), 0]);
                        record(out, rt::BOOLERR, &body);
                    },
                    Cell::Error(code) => {
                        body.extend_from_slice(&[*code, 1]);
                        record(out, rt::BOOLERR, &body);
                    },
                    Cell::Text(text) if self.uses_sst() => {
                        let index = sst.iter().position(|s| s == text).unwrap_or(0);
                        body.extend_from_slice(&(index as u32).to_le_bytes());
                        record(out, rt::LABELSST, &body);
                    },
                    Cell::Text(text) => {
                        body.extend(self.long_string(text));
                        record(out, rt::LABEL, &body);
                    },
                    Cell::FormulaText(text) => {
                        body.extend_from_slice(&[0x00, 0, 0, 0, 0, 0, 0xFF, 0xFF]);
                        body.extend_from_slice(&0u16.to_le_bytes());
                        body.extend_from_slice(&0u32.to_le_bytes());
                        body.extend_from_slice(&0u16.to_le_bytes());
                        record(out, rt::FORMULA, &body);
                        record(out, rt::STRING, &self.long_string(text));
                    },
                }
            }
        }

        record(out, rt::EOF, &[]);
    }
}

/// Option flags, character bytes and UTF-16 length of a BIFF8 string
fn unicode_chars(text: &str) -> (u8, Vec<u8>, usize) {
    let units: Vec<u16> = text.encode_utf16().collect();
    if units.iter().all(|&u| u <= 0xFF) {
        (0x00, units.iter().map(|&u| u as u8).collect(), units.len())
    } else {
        let bytes = units.iter().flat_map(|u| u.to_le_bytes()).collect();
        (0x01, bytes, units.len())
    }
}

fn record(out: &mut Vec<u8>, record_type: u16, body: &[u8]) {
    out.extend_from_slice(&record_type.to_le_bytes());
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(body);
}
