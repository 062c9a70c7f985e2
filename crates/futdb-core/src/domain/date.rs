use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::macros::format_description;
use time::{Date, Duration, Month};

use crate::ValidationError;

/// Calendar date on which market activity was observed, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(Date);

impl TradingDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        // DuckDB renders DATE casts as plain ISO dates; tolerate a trailing time part.
        let date_part = trimmed.split([' ', 'T']).next().unwrap_or(trimmed);
        Date::parse(date_part, format_description!("[year]-[month]-[day]"))
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: input.to_owned(),
            })
    }

    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let month_value =
            Month::try_from(month).map_err(|_| ValidationError::InvalidMonth { month })?;
        Date::from_calendar_date(year, month_value, day)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate {
                value: format!("{year:04}-{month:02}-{day:02}"),
            })
    }

    pub const fn from_date(value: Date) -> Self {
        Self(value)
    }

    pub const fn into_inner(self) -> Date {
        self.0
    }

    pub const fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u8 {
        u8::from(self.0.month())
    }

    pub const fn day(self) -> u8 {
        self.0.day()
    }

    /// ISO-8601 week number (1..=53).
    pub const fn iso_week(self) -> u8 {
        self.0.iso_week()
    }

    pub fn quarter(self) -> u8 {
        (self.month() - 1) / 3 + 1
    }

    pub fn plus_days(self, days: i64) -> Self {
        Self(self.0.saturating_add(Duration::days(days)))
    }

    /// Signed number of days from `self` to `other`.
    pub fn days_until(self, other: Self) -> i64 {
        (other.0 - self.0).whole_days()
    }
}

impl Display for TradingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

impl From<Date> for TradingDate {
    fn from(value: Date) -> Self {
        Self(value)
    }
}

impl TryFrom<&str> for TradingDate {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl Serialize for TradingDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TradingDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Inclusive range of calendar dates used by windowed checks and reports.
///
/// Windows are plain calendar timelines. They never encode an exchange
/// schedule; whether a day "should" have data is answered by the
/// data-derived calendar, not by the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: TradingDate,
    pub end: TradingDate,
}

impl DateWindow {
    pub fn new(start: TradingDate, end: TradingDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `days`-long window whose last day is `end`.
    pub fn ending_at(end: TradingDate, days: u32) -> Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::EmptyWindow);
        }
        Ok(Self {
            start: end.plus_days(-(i64::from(days) - 1)),
            end,
        })
    }

    pub fn contains(&self, date: TradingDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len_days(&self) -> usize {
        usize::try_from(self.start.days_until(self.end) + 1).unwrap_or(0)
    }

    /// Every calendar day in the window, ascending.
    pub fn days(&self) -> Vec<TradingDate> {
        let mut out = Vec::with_capacity(self.len_days());
        let mut current = self.start;
        while current <= self.end {
            out.push(current);
            current = current.plus_days(1);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_iso_date() {
        let parsed = TradingDate::parse("2025-01-06").expect("must parse");
        assert_eq!(parsed.to_string(), "2025-01-06");
        assert_eq!(parsed.iso_week(), 2);
        assert_eq!(parsed.quarter(), 1);
    }

    #[test]
    fn tolerates_timestamp_suffix() {
        let parsed = TradingDate::parse("2025-03-18 00:00:00").expect("must parse");
        assert_eq!(parsed, TradingDate::from_ymd(2025, 3, 18).expect("date"));
    }

    #[test]
    fn rejects_garbage() {
        let err = TradingDate::parse("18/03/2025").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidDate { .. }));
    }

    #[test]
    fn window_ending_at_counts_calendar_days() {
        let end = TradingDate::parse("2025-01-14").expect("date");
        let window = DateWindow::ending_at(end, 14).expect("window");
        assert_eq!(window.start.to_string(), "2025-01-01");
        assert_eq!(window.len_days(), 14);
        assert_eq!(window.days().len(), 14);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let start = TradingDate::parse("2025-02-01").expect("date");
        let end = TradingDate::parse("2025-01-01").expect("date");
        let err = DateWindow::new(start, end).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvertedWindow { .. }));
    }
}
