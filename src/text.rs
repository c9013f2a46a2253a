//! Helpers for the text found in CSV cells.

use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use unicode_normalization::UnicodeNormalization;

/// NFKC-normalizes `s`, folding full-width digits and letters to ASCII.
pub fn normalize(s: &str) -> String {
    s.nfkc().collect()
}

/// Replaces runs of spaces with a single space.
pub fn collapse_spaces(s: &str) -> String {
    lazy_static! {
        static ref SPACES_RX: Regex = Regex::new(" +").unwrap();
    }
    SPACES_RX.replace_all(s, " ").into_owned()
}

/// Parses a monetary cell such as `1,234` or `１２３４`. An empty cell is zero.
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = normalize(s)
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(&cleaned).map_err(|e| anyhow!("bad amount {:?}: {}", s, e))
}

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%Y%m%d"];

/// Parses `YYYY/mm/dd`, `YYYY-mm-dd` or `YYYYmmdd`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = normalize(s);
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}
