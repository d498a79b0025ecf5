//! Ja Text - Japanese text processing for business documents
//!
//! This crate provides:
//! - Yen amount formatting with thousands separators ("220,000 円")
//! - Percentage labels for tax rates ("10%")
//! - Gregorian and Japanese-era (和暦) date formatting, weekday labels
//! - Lenient parsing of amounts typed by people ("２２０，０００円")
//! - Width-driven line wrapping that honours kinsoku (禁則) rules
//!
//! # Example
//!
//! ```ignore
//! use ja_text::{format_yen, wrap_by_width};
//!
//! let total = format_yen(220_000); // "220,000 円"
//! let lines = wrap_by_width("お支払いありがとうございました。", 120.0, |s| measure(s));
//! ```

mod formatter;
mod linebreak;

pub use formatter::{
    format_date_ja, format_date_slash, format_date_with_weekday, format_datetime_slash,
    format_percent, format_rate, format_wareki, format_with_thousands, format_yen, parse_amount,
    parse_rate, weekday_label, JaFormatter,
};
pub use linebreak::{
    can_break_between, clamp_lines, is_line_end_prohibited, is_line_start_prohibited,
    wrap_by_width, ELLIPSIS,
};

use thiserror::Error;

/// Errors that can occur during Japanese text processing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextError {
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

/// Result type for text operations
pub type Result<T> = std::result::Result<T, TextError>;
