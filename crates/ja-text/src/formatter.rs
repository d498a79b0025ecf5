//! Japanese number, currency, and date formatting

use crate::{Result, TextError};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};

/// Era name, first day covered, and the Gregorian year counted as year 1
///
/// Meiji dates are only supported from the 1873 solar-calendar switch.
const ERAS: [(&str, (i32, u32, u32), i32); 5] = [
    ("令和", (2019, 5, 1), 2019),
    ("平成", (1989, 1, 8), 1989),
    ("昭和", (1926, 12, 25), 1926),
    ("大正", (1912, 7, 30), 1912),
    ("明治", (1873, 1, 1), 1868),
];

const WEEKDAYS: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];

/// Japanese text formatting utilities
pub struct JaFormatter;

impl JaFormatter {
    /// Format a whole-yen amount, e.g. "220,000 円"
    pub fn yen(amount: i64) -> String {
        format_yen(amount)
    }

    /// Format a tax rate as a percentage, e.g. "10%"
    pub fn percent(rate: f64) -> String {
        format_percent(rate)
    }

    /// Format a date as "2025年4月1日"
    pub fn date(date: NaiveDate) -> String {
        format_date_ja(date)
    }

    /// Format a date in the Japanese era calendar, e.g. "令和7年4月1日"
    pub fn wareki(date: NaiveDate) -> Result<String> {
        format_wareki(date)
    }
}

/// Format integer with comma thousand separators
///
/// # Examples
/// ```
/// use ja_text::format_with_thousands;
/// assert_eq!(format_with_thousands(1234567), "1,234,567");
/// assert_eq!(format_with_thousands(-5455), "-5,455");
/// ```
pub fn format_with_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if n < 0 {
        result.insert(0, '-');
    }
    result
}

/// Format a whole-yen amount with separators and the currency suffix
///
/// # Examples
/// ```
/// use ja_text::format_yen;
/// assert_eq!(format_yen(220000), "220,000 円");
/// ```
pub fn format_yen(amount: i64) -> String {
    format!("{} 円", format_with_thousands(amount))
}

/// Render a rate without trailing zeros ("10", "8", "8.5")
pub fn format_rate(rate: f64) -> String {
    if rate.fract() == 0.0 {
        return format!("{rate:.0}");
    }
    let text = format!("{rate:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Render a rate as a percentage label ("10%")
pub fn format_percent(rate: f64) -> String {
    format!("{}%", format_rate(rate))
}

/// "2025/04/01"
pub fn format_date_slash(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}

/// "2025/04/01 09:30"
pub fn format_datetime_slash(datetime: NaiveDateTime) -> String {
    datetime.format("%Y/%m/%d %H:%M").to_string()
}

/// "2025年4月1日"
pub fn format_date_ja(date: NaiveDate) -> String {
    format!("{}年{}月{}日", date.year(), date.month(), date.day())
}

/// Single-character weekday label ("月" .. "日")
pub fn weekday_label(date: NaiveDate) -> &'static str {
    let index = match date.weekday() {
        Weekday::Mon => 0,
        Weekday::Tue => 1,
        Weekday::Wed => 2,
        Weekday::Thu => 3,
        Weekday::Fri => 4,
        Weekday::Sat => 5,
        Weekday::Sun => 6,
    };
    WEEKDAYS[index]
}

/// "2025年4月1日（火）"
pub fn format_date_with_weekday(date: NaiveDate) -> String {
    format!("{}（{}）", format_date_ja(date), weekday_label(date))
}

/// Format a date in the Japanese era calendar
///
/// The first year of an era is written 元年.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use ja_text::format_wareki;
/// let date = NaiveDate::from_ymd_opt(2019, 5, 1).unwrap();
/// assert_eq!(format_wareki(date).unwrap(), "令和元年5月1日");
/// ```
pub fn format_wareki(date: NaiveDate) -> Result<String> {
    let key = (date.year(), date.month(), date.day());
    let (era, _, first_year) = ERAS
        .iter()
        .find(|(_, start, _)| key >= *start)
        .ok_or_else(|| TextError::InvalidDate(format!("{date} is before the supported eras")))?;

    let era_year = date.year() - first_year + 1;
    let year = if era_year == 1 {
        "元".to_string()
    } else {
        era_year.to_string()
    };
    Ok(format!("{era}{year}年{}月{}日", date.month(), date.day()))
}

/// Fold full-width digits and punctuation to ASCII
fn normalize_numeric(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
            '，' => ',',
            '．' => '.',
            '－' => '-',
            '％' => '%',
            '　' => ' ',
            _ => c,
        })
        .collect()
}

/// Parse a whole-yen amount typed by a person
///
/// Accepts full-width digits, thousands separators, a leading `¥` and a
/// trailing `円`. Fractional yen are rejected.
pub fn parse_amount(input: &str) -> Result<i64> {
    let invalid = || TextError::InvalidNumber(input.to_string());

    let normalized = normalize_numeric(input);
    let trimmed = normalized
        .trim()
        .trim_start_matches(['¥', '￥'])
        .trim_end_matches('円')
        .trim();
    let digits: String = trimmed.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return Err(invalid());
    }

    if let Ok(value) = digits.parse::<i64>() {
        return Ok(value);
    }
    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 => {
            Ok(value as i64)
        }
        _ => Err(invalid()),
    }
}

/// Parse a percentage rate ("10", "8.5", "10%")
pub fn parse_rate(input: &str) -> Result<f64> {
    let normalized = normalize_numeric(input);
    let trimmed = normalized.trim().trim_end_matches('%').trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(TextError::InvalidNumber(input.to_string())),
    }
}
