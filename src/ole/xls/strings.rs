//! String decoding for BIFF records
//!
//! BIFF8 stores text as XLUnicodeString: a character count, an option byte,
//! optional rich-text and phonetic headers, then either Latin-1 ("compressed")
//! or UTF-16LE characters. BIFF5 stores plain byte strings in the workbook
//! codepage.

use encoding_rs::Encoding;
use tracing::warn;

use crate::binary;
use crate::ole::codepage::decode_bytes;
use crate::ole::xls::error::XlsResult;
use crate::ole::xls::records::Record;

const FLAG_HIGH_BYTE: u8 = 0x01;
const FLAG_EXT: u8 = 0x04;
const FLAG_RICH: u8 = 0x08;

/// Width of a string's length prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenWidth {
    U8,
    U16,
}

impl LenWidth {
    fn read(self, data: &[u8], offset: usize) -> XlsResult<(usize, usize)> {
        Ok(match self {
            LenWidth::U8 => (usize::from(binary::read_u8(data, offset)?), 1),
            LenWidth::U16 => (usize::from(binary::read_u16_le(data, offset)?), 2),
        })
    }
}

/// Parse a BIFF8 unicode string at `offset`
///
/// Returns the text and the number of bytes consumed, including any rich-text
/// runs and extended data that follow the characters.
pub fn unicode_string(data: &[u8], offset: usize, width: LenWidth) -> XlsResult<(String, usize)> {
    let (cch, prefix) = width.read(data, offset)?;
    let mut pos = offset + prefix;

    // Empty strings sometimes omit the option byte at the end of a record
    if cch == 0 && pos >= data.len() {
        return Ok((String::new(), pos - offset));
    }

    let flags = binary::read_u8(data, pos)?;
    pos += 1;

    let mut trailing = 0usize;
    if flags & FLAG_RICH != 0 {
        trailing += usize::from(binary::read_u16_le(data, pos)?) * 4;
        pos += 2;
    }
    if flags & FLAG_EXT != 0 {
        trailing += binary::read_u32_le(data, pos)? as usize;
        pos += 4;
    }

    let byte_len = if flags & FLAG_HIGH_BYTE != 0 { cch * 2 } else { cch };
    let bytes = binary::read_slice(data, pos, byte_len)?;
    let text = decode_chars(bytes, flags & FLAG_HIGH_BYTE != 0);
    pos += byte_len + trailing;

    Ok((text, pos - offset))
}

/// Parse a BIFF5 byte string at `offset`, decoding with `encoding`
pub fn byte_string(
    data: &[u8],
    offset: usize,
    width: LenWidth,
    encoding: &'static Encoding,
) -> XlsResult<(String, usize)> {
    let (len, prefix) = width.read(data, offset)?;
    let bytes = binary::read_slice(data, offset + prefix, len)?;
    Ok((decode_bytes(bytes, encoding), prefix + len))
}

fn decode_chars(bytes: &[u8], high_byte: bool) -> String {
    if high_byte {
        binary::decode_utf16le(bytes)
    } else {
        binary::decode_latin1(bytes)
    }
}

/// Parse the shared string table
///
/// A string's characters may continue into the next CONTINUE body, which then
/// starts with a fresh option byte that can switch between compressed and
/// UTF-16 characters. A table that ends early yields the strings read so far.
pub fn parse_sst(record: &Record) -> XlsResult<Vec<String>> {
    record.require(8)?;
    let unique = binary::read_u32_le(&record.data, 4)? as usize;

    let mut cursor = SstCursor {
        data: &record.data,
        boundaries: &record.continues,
        pos: 8,
    };
    // Each string needs at least three bytes, so cap the preallocation
    let mut strings = Vec::with_capacity(unique.min(record.data.len() / 3));

    for index in 0..unique {
        match cursor.next_string() {
            Some(text) => strings.push(text),
            None => {
                warn!(
                    index,
                    expected = unique,
                    "shared string table ends early, keeping {} strings",
                    strings.len()
                );
                break;
            },
        }
    }

    Ok(strings)
}

struct SstCursor<'a> {
    data: &'a [u8],
    boundaries: &'a [usize],
    pos: usize,
}

impl SstCursor<'_> {
    /// End of the record segment containing `pos`
    fn segment_end(&self) -> usize {
        self.boundaries
            .iter()
            .copied()
            .find(|&b| b >= self.pos)
            .unwrap_or(self.data.len())
    }

    fn read_u8(&mut self) -> Option<u8> {
        let value = binary::read_u8(self.data, self.pos).ok()?;
        self.pos += 1;
        Some(value)
    }

    fn read_u16(&mut self) -> Option<u16> {
        let value = binary::read_u16_le(self.data, self.pos).ok()?;
        self.pos += 2;
        Some(value)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let value = binary::read_u32_le(self.data, self.pos).ok()?;
        self.pos += 4;
        Some(value)
    }

    fn next_string(&mut self) -> Option<String> {
        let mut remaining = usize::from(self.read_u16()?);
        let mut flags = self.read_u8()?;

        let mut trailing = 0usize;
        if flags & FLAG_RICH != 0 {
            trailing += usize::from(self.read_u16()?) * 4;
        }
        if flags & FLAG_EXT != 0 {
            trailing += self.read_u32()? as usize;
        }

        let mut text = String::new();
        while remaining > 0 {
            let width = if flags & FLAG_HIGH_BYTE != 0 { 2 } else { 1 };
            let end = self.segment_end();
            let take = remaining.min((end - self.pos) / width);

            let bytes = &self.data[self.pos..self.pos + take * width];
            text.push_str(&decode_chars(bytes, width == 2));
            self.pos += take * width;
            remaining -= take;

            if remaining > 0 {
                if end >= self.data.len() {
                    return None;
                }
                // Characters resume in the next CONTINUE after a new option byte
                self.pos = end;
                flags = self.read_u8()?;
            }
        }

        self.pos += trailing;
        Some(text)
    }
}
