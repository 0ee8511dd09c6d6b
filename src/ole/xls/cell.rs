//! Cell values for XLS files

use std::fmt;

/// A decoded cell value
///
/// Numbers, including dates and integers stored as RK values, are kept as
/// `f64`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// BIFF error code (0x07 `#DIV/0!`, 0x2A `#N/A`, ...)
    Error(u8),
}

impl CellValue {
    /// Whether the value counts as absent when a field is extracted
    ///
    /// Empty cells, empty text, zero and `false` are all absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use kelly_xls::ole::xls::CellValue;
    ///
    /// assert!(CellValue::Number(0.0).is_falsy());
    /// assert!(CellValue::Text(String::new()).is_falsy());
    /// assert!(!CellValue::Text(" ".into()).is_falsy());
    /// ```
    pub fn is_falsy(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(n) => *n == 0.0,
            CellValue::Bool(b) => !*b,
            CellValue::Error(_) => false,
        }
    }

    /// Whether the cell holds nothing, or only whitespace text
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => trim_space(s).is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    /// Numbers print in shortest round-trip form and always carry a
    /// fractional part or exponent (`100.0`, `0.5`, `1e+22`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            CellValue::Error(code) => write!(f, "{code}"),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    // Shortest round-trip digits; scientific form sets the decimal exponent
    let scientific = format!("{value:e}");
    let Some((mantissa, exp)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exp.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let mut buffer = ryu::Buffer::new();
        return buffer.format_finite(value).to_string();
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

/// Whitespace as text fields are trimmed: Unicode White_Space plus the
/// ASCII separators U+001C..U+001F
pub fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Trim leading and trailing [`is_space`] characters
pub fn trim_space(s: &str) -> &str {
    s.trim_matches(is_space)
}

/// Decode an RK value
///
/// Bit 0 marks the value as scaled by 100, bit 1 selects a 30-bit signed
/// integer over the high 30 bits of an IEEE double.
pub fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        f64::from((rk as i32) >> 2)
    } else {
        f64::from_bits(u64::from(rk & 0xFFFF_FFFC) << 32)
    };

    if rk & 0x01 != 0 { value / 100.0 } else { value }
}
