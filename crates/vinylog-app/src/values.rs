// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    InvalidMoney,
    NegativeMoney,
    InvalidDate,
    InvalidYear,
    InvalidChoice,
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMoney => f.write_str("invalid money value"),
            Self::NegativeMoney => f.write_str("negative money value"),
            Self::InvalidDate => f.write_str("invalid date value"),
            Self::InvalidYear => f.write_str("invalid year value"),
            Self::InvalidChoice => f.write_str("invalid choice"),
        }
    }
}

impl std::error::Error for ValueError {}

pub type ValueResult<T> = std::result::Result<T, ValueError>;

pub fn parse_required_cents(input: &str) -> ValueResult<i64> {
    parse_cents(input.trim())
}

pub fn parse_optional_cents(input: &str) -> ValueResult<Option<i64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_cents(trimmed).map(Some)
}

/// `$1,234.50`-style rendering for table cells and totals.
pub fn format_cents(cents: i64) -> String {
    let (sign, cents) = normalize_sign(cents);
    let dollars = cents / 100;
    let remainder = cents % 100;
    format!("{sign}${}.{:02}", comma_format(dollars), remainder)
}

pub fn format_optional_cents(cents: Option<i64>) -> String {
    cents.map_or_else(String::new, format_cents)
}

/// Two-decimal rendering without currency sign or grouping, used in query
/// strings and editor drafts. Round-trips exactly through `parse_cents`.
pub fn format_plain_cents(cents: i64) -> String {
    let (sign, cents) = normalize_sign(cents);
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

pub fn format_plain_optional_cents(cents: Option<i64>) -> String {
    cents.map_or_else(String::new, format_plain_cents)
}

pub fn parse_required_date(input: &str) -> ValueResult<Date> {
    parse_date(input.trim())
}

pub fn parse_optional_date(input: &str) -> ValueResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

pub fn format_date(value: Option<Date>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .expect("date format is valid")
}

pub fn parse_optional_year(input: &str) -> ValueResult<Option<i32>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed.parse::<i32>().map_err(|_| ValueError::InvalidYear)?;
    if !(1000..=9999).contains(&value) {
        return Err(ValueError::InvalidYear);
    }
    Ok(Some(value))
}

fn parse_cents(input: &str) -> ValueResult<i64> {
    let clean = input.replace(',', "");
    if clean.starts_with('-') {
        return Err(ValueError::NegativeMoney);
    }

    let clean = clean.strip_prefix('$').unwrap_or(&clean);
    if clean.is_empty() {
        return Err(ValueError::InvalidMoney);
    }

    let parts = clean.split('.').collect::<Vec<_>>();
    if parts.len() > 2 {
        return Err(ValueError::InvalidMoney);
    }

    let whole = parse_digits(parts[0])?;
    if whole > i64::MAX / 100 {
        return Err(ValueError::InvalidMoney);
    }

    let mut frac = 0i64;
    if parts.len() == 2 {
        if parts[1].is_empty() || parts[1].len() > 2 {
            return Err(ValueError::InvalidMoney);
        }
        frac = parse_digits(parts[1])?;
        if parts[1].len() == 1 {
            frac *= 10;
        }
    }

    whole
        .checked_mul(100)
        .and_then(|value| value.checked_add(frac))
        .ok_or(ValueError::InvalidMoney)
}

fn parse_digits(input: &str) -> ValueResult<i64> {
    if input.is_empty() {
        return Ok(0);
    }
    if !input.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(ValueError::InvalidMoney);
    }
    input.parse::<i64>().map_err(|_| ValueError::InvalidMoney)
}

fn parse_date(input: &str) -> ValueResult<Date> {
    Date::parse(input, &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValueError::InvalidDate)
}

fn normalize_sign(cents: i64) -> (&'static str, i64) {
    if cents < 0 {
        ("-", -cents)
    } else {
        ("", cents)
    }
}

fn comma_format(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
