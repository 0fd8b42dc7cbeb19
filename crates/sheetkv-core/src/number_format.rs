//! Number format ids and display formatting
//!
//! Only the handful of formats that downstream consumers parse as financial
//! figures are rendered specially; everything else is shown as a plain
//! decimal. The table is fixed so every backing document renders the same
//! strings.

use chrono::{Datelike, Days, NaiveDate};

// Built-in format IDs
/// 0 - General
pub const ID_GENERAL: u32 = 0;
/// 4 - #,##0.00
pub const ID_NUMBER_SEP_DEC2: u32 = 4;
/// 9 - 0%
pub const ID_PERCENT_INT: u32 = 9;
/// 10 - 0.00%
pub const ID_PERCENT_DEC2: u32 = 10;
/// 41 - accounting, no symbol
pub const ID_ACCOUNTING: u32 = 41;
/// 42 - accounting with symbol
pub const ID_ACCOUNTING_SYMBOL: u32 = 42;
/// 164 - first custom id; the loan templates use it for "0.00 %"
pub const ID_PERCENT_SPACED: u32 = 164;

/// Largest serial Excel can display as a date (9999-12-31)
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Epoch used to turn serial day numbers into dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSystem {
    /// Day 1 is 1900-01-01, with the fictitious 1900-02-29 as day 60
    #[default]
    Excel1900,
    /// Day 0 is 1904-01-01
    Excel1904,
}

/// Renders numbers the way a spreadsheet shows them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormatter {
    currency_symbol: String,
    date_system: DateSystem,
}

impl Default for NumberFormatter {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            date_system: DateSystem::Excel1900,
        }
    }
}

impl NumberFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different currency symbol for formats 4, 41 and 42
    pub fn with_currency_symbol<S: Into<String>>(mut self, symbol: S) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    /// Use a different date epoch
    pub fn with_date_system(mut self, date_system: DateSystem) -> Self {
        self.date_system = date_system;
        self
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    pub fn date_system(&self) -> DateSystem {
        self.date_system
    }

    /// Format a number for display
    ///
    /// ```
    /// use sheetkv_core::NumberFormatter;
    ///
    /// let f = NumberFormatter::new();
    /// assert_eq!(f.format(0.1, Some(9), false), "10%");
    /// assert_eq!(f.format(0.125, Some(10), false), "12.50%");
    /// assert_eq!(f.format(1234.5, Some(41), false), "$1,234.50");
    /// assert_eq!(f.format(1234.5, None, false), "1234.5");
    /// assert_eq!(f.format(45292.0, Some(14), true), "2024-01-01");
    /// ```
    pub fn format(&self, value: f64, format_id: Option<u32>, is_date_formatted: bool) -> String {
        if is_date_formatted {
            if let Some(date) = serial_to_date(value, self.date_system) {
                return date;
            }
        }

        match format_id {
            Some(ID_PERCENT_INT) => format!("{}%", format_fixed(value * 100.0, 0)),
            Some(ID_PERCENT_DEC2) => format!("{}%", format_fixed(value * 100.0, 2)),
            Some(ID_PERCENT_SPACED) => format!("{} %", format_fixed(value * 100.0, 2)),
            Some(ID_NUMBER_SEP_DEC2) | Some(ID_ACCOUNTING) | Some(ID_ACCOUNTING_SYMBOL) => {
                self.format_currency(value)
            }
            _ => format_plain(value),
        }
    }

    fn format_currency(&self, value: f64) -> String {
        let body = format_with_thousands(value.abs(), 2);
        if value < 0.0 && body.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
            format!("-{}{}", self.currency_symbol, body)
        } else {
            format!("{}{}", self.currency_symbol, body)
        }
    }
}

/// Plain decimal: up to 6 fractional digits, trailing zeros trimmed
pub fn format_plain(value: f64) -> String {
    let fixed = format!("{:.6}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    without_negative_zero(trimmed)
}

/// Fixed decimals, rounding half away from zero like a spreadsheet does
fn format_fixed(value: f64, decimals: usize) -> String {
    let text = format!("{:.prec$}", round_half_away(value, decimals), prec = decimals);
    without_negative_zero(&text)
}

/// Round to `decimals` places with ties away from zero
///
/// `{:.N}` alone rounds exact binary ties to even (1234.125 -> 1234.12).
fn round_half_away(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

fn without_negative_zero(text: &str) -> String {
    match text.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => text.to_string(),
    }
}

/// Format number with thousands separators
fn format_with_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.prec$}", round_half_away(value, decimals), prec = decimals);
    let (int_part, dec_part) = match formatted.split_once('.') {
        Some((int_part, dec_part)) => (int_part, Some(dec_part)),
        None => (formatted.as_str(), None),
    };

    let mut with_sep = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_sep.push(',');
        }
        with_sep.push(c);
    }
    let int_with_sep: String = with_sep.chars().rev().collect();

    match dec_part {
        Some(dec) => format!("{int_with_sep}.{dec}"),
        None => int_with_sep,
    }
}

/// Render a serial day number as `YYYY-MM-DD`; the time of day is dropped
pub fn serial_to_date(serial: f64, date_system: DateSystem) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_DATE_SERIAL {
        return None;
    }
    let day = serial.floor() as u64;

    let date = match date_system {
        DateSystem::Excel1900 => {
            // Serial 60 is the fictional 1900-02-29.
            if day == 60 {
                return Some("1900-02-29".to_string());
            }
            let adjusted = if day > 60 { day - 1 } else { day };
            NaiveDate::from_ymd_opt(1899, 12, 31)?.checked_add_days(Days::new(adjusted))?
        }
        DateSystem::Excel1904 => {
            NaiveDate::from_ymd_opt(1904, 1, 1)?.checked_add_days(Days::new(day))?
        }
    };

    Some(format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        date.month(),
        date.day()
    ))
}

/// Whether a built-in format id renders dates or times
pub fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Check if a format code is a date/time format
pub fn is_date_format_code(format_code: &str) -> bool {
    let lower = format_code.to_lowercase();

    // Skip text in quotes and brackets
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut cleaned = String::new();

    for c in lower.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if !in_quotes && !in_brackets => cleaned.push(c),
            _ => {}
        }
    }

    if cleaned == "general" {
        return false;
    }

    cleaned.contains('y')
        || (cleaned.contains('m') && !cleaned.contains('#') && !cleaned.contains('0'))
        || cleaned.contains('d')
        || cleaned.contains('h')
        || (cleaned.contains('s') && cleaned.contains(':'))
}
