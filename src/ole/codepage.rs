//! Codepage decoding for legacy byte strings
//!
//! BIFF5 workbooks store text as 8-bit strings in the codepage named by the
//! CODEPAGE record, and that record is frequently wrong in old files. The
//! reader therefore takes an explicit encoding from the caller; this module
//! turns the usual ways of naming one (`cp1252`, `windows-1256`, `1256`, any
//! WHATWG label) into an `encoding_rs` encoding.

use encoding_rs::Encoding;

/// Decode bytes with a legacy encoding
///
/// `encoding_rs` guarantees valid UTF-8 output; unmappable bytes become
/// U+FFFD.
///
/// # Examples
///
/// ```
/// use kelly_xls::ole::codepage::decode_bytes;
///
/// let text = decode_bytes(b"caf\xE9", encoding_rs::WINDOWS_1252);
/// assert_eq!(text, "café");
/// ```
#[inline]
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    encoding
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

/// Map Windows codepage identifier to encoding_rs Encoding
///
/// Returns `None` for codepages `encoding_rs` has no table for.
#[inline]
pub fn codepage_to_encoding(codepage: u32) -> Option<&'static Encoding> {
    match codepage {
        // IBM866 (close approximation to CP437)
        437 | 866 => Some(encoding_rs::IBM866),

        // Windows codepages
        874 => Some(encoding_rs::WINDOWS_874),   // Thai
        1250 => Some(encoding_rs::WINDOWS_1250), // Central European
        1251 => Some(encoding_rs::WINDOWS_1251), // Cyrillic
        1252 => Some(encoding_rs::WINDOWS_1252), // Western European (most common)
        1253 => Some(encoding_rs::WINDOWS_1253), // Greek
        1254 => Some(encoding_rs::WINDOWS_1254), // Turkish
        1255 => Some(encoding_rs::WINDOWS_1255), // Hebrew
        1256 => Some(encoding_rs::WINDOWS_1256), // Arabic
        1257 => Some(encoding_rs::WINDOWS_1257), // Baltic
        1258 => Some(encoding_rs::WINDOWS_1258), // Vietnamese

        // East Asian codepages
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),

        // ISO 8859 series
        28592 => Some(encoding_rs::ISO_8859_2),
        28593 => Some(encoding_rs::ISO_8859_3),
        28594 => Some(encoding_rs::ISO_8859_4),
        28595 => Some(encoding_rs::ISO_8859_5),
        28596 => Some(encoding_rs::ISO_8859_6), // Arabic
        28597 => Some(encoding_rs::ISO_8859_7),
        28598 => Some(encoding_rs::ISO_8859_8),
        28605 => Some(encoding_rs::ISO_8859_15),

        // Macintosh
        10000 => Some(encoding_rs::MACINTOSH),

        // Unicode
        1200 => Some(encoding_rs::UTF_16LE),
        65001 => Some(encoding_rs::UTF_8),

        _ => None,
    }
}

/// Resolve an encoding name to a single-byte legacy encoding
///
/// Accepts `cpNNNN`, `windows-NNNN`, a bare codepage number, or any label
/// `encoding_rs` knows. Multi-byte encodings are rejected because BIFF byte
/// strings count their length in bytes.
pub fn resolve_label(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    let lower = label.to_ascii_lowercase();

    let numeric = lower
        .strip_prefix("cp")
        .or_else(|| lower.strip_prefix("windows-"))
        .unwrap_or(&lower);

    let encoding = match numeric.parse::<u32>() {
        Ok(codepage) => codepage_to_encoding(codepage)?,
        Err(_) => Encoding::for_label(label.as_bytes())?,
    };

    encoding.is_single_byte().then_some(encoding)
}
