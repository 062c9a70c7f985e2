use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, Weekday};

use crate::{TradingDate, ValidationError};

const MAX_ROOT_LEN: usize = 4;

/// CME month codes, January through December.
pub const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

pub fn month_from_code(code: char) -> Option<u8> {
    MONTH_CODES
        .iter()
        .position(|candidate| *candidate == code.to_ascii_uppercase())
        .and_then(|index| u8::try_from(index + 1).ok())
}

/// How abbreviated year digits in a native symbol map to a calendar year.
///
/// Two-digit years at or below `two_digit_pivot` land in the 2000s, the rest
/// in the 1900s. A single digit is added to `decade_base`, so `H6` read with a
/// 2020 base is March 2026. The single-digit form is only unambiguous inside
/// one decade; callers that replay older history must pick the base to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearResolution {
    pub decade_base: i32,
    pub two_digit_pivot: u8,
}

impl YearResolution {
    pub const DEFAULT_PIVOT: u8 = 50;

    pub fn for_reference_year(year: i32) -> Self {
        Self {
            decade_base: year - year.rem_euclid(10),
            two_digit_pivot: Self::DEFAULT_PIVOT,
        }
    }

    /// Resolution anchored on the current UTC year.
    pub fn current() -> Self {
        Self::for_reference_year(OffsetDateTime::now_utc().year())
    }

    fn resolve(self, digits: &str) -> Option<i32> {
        let value: i32 = digits.parse().ok()?;
        match digits.len() {
            1 => Some(self.decade_base + value),
            2 if value <= i32::from(self.two_digit_pivot) => Some(2000 + value),
            2 => Some(1900 + value),
            4 => Some(value),
            _ => None,
        }
    }
}

impl Default for YearResolution {
    fn default() -> Self {
        Self::current()
    }
}

/// A parsed outright futures symbol such as `ESH6` or `SR3Z25`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuturesSymbol {
    pub root: String,
    pub month: u8,
    pub year: i32,
    pub month_code: char,
}

impl FuturesSymbol {
    /// Parse `ROOT + MONTH_CODE + YEAR`. The shortest root that leaves a valid
    /// month code followed only by digits wins. Spreads, options and anything
    /// else that does not fit return `None`.
    pub fn parse(native_symbol: &str, years: YearResolution) -> Option<Self> {
        let symbol = native_symbol.trim();
        if symbol.len() < 3 || !symbol.is_ascii() {
            return None;
        }
        if !symbol.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return None;
        }

        for root_len in 1..=MAX_ROOT_LEN.min(symbol.len() - 2) {
            let (root, remaining) = symbol.split_at(root_len);
            // Roots may lead with a digit (`6E`) but are never all digits.
            if !root.chars().any(|ch| ch.is_ascii_alphabetic()) {
                continue;
            }
            let mut chars = remaining.chars();
            let Some(code) = chars.next() else {
                continue;
            };
            let digits = chars.as_str();
            if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
                continue;
            }
            let Some(month) = month_from_code(code) else {
                continue;
            };
            let Some(year) = years.resolve(digits) else {
                continue;
            };
            return Some(Self {
                root: root.to_ascii_uppercase(),
                month,
                year,
                month_code: code.to_ascii_uppercase(),
            });
        }

        None
    }

    pub fn imm_expiry(&self) -> Result<TradingDate, ValidationError> {
        imm_expiry(self.month, self.year)
    }
}

/// Third Wednesday of the month: first Wednesday on or after the 1st, plus 14 days.
pub fn imm_expiry(month: u8, year: i32) -> Result<TradingDate, ValidationError> {
    let month_value = Month::try_from(month).map_err(|_| ValidationError::InvalidMonth { month })?;
    let first = Date::from_calendar_date(year, month_value, 1)
        .map_err(|_| ValidationError::InvalidYear { year })?;
    let offset = (7 + i64::from(Weekday::Wednesday.number_days_from_monday())
        - i64::from(first.weekday().number_days_from_monday()))
        % 7;
    Ok(TradingDate::from_date(first).plus_days(offset + 14))
}
