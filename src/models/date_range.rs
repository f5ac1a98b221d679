//! Validated search date ranges.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use thiserror::Error;

/// Errors from parsing or validating a date range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    #[error("invalid date format: {input} (expected YYYY-MM-DD)")]
    InvalidDateFormat { input: String },
    #[error("start date {start} is after end date {end}")]
    InvalidRangeOrder { start: NaiveDate, end: NaiveDate },
}

/// Inclusive calendar date range used for a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range from already-parsed dates.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::InvalidRangeOrder { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse and validate a pair of `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Split into consecutive month-long sub-ranges.
    ///
    /// Each chunk starts on the day after the previous one ended and ends one
    /// calendar month later (clamped to the target month's last day), minus a
    /// day. The final chunk is truncated at `end`.
    pub fn monthly_chunks(&self) -> Vec<DateRange> {
        let mut chunks = Vec::new();
        let mut current = self.start;

        while current <= self.end {
            let next = add_month(current);
            let chunk_end = (next - Duration::days(1)).min(self.end);
            chunks.push(DateRange {
                start: current,
                end: chunk_end,
            });
            current = chunk_end + Duration::days(1);
        }

        chunks
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, DateRangeError> {
    let invalid = || DateRangeError::InvalidDateFormat {
        input: input.to_string(),
    };

    // chrono's %Y accepts signs and extra digits, so check the shape first.
    let bytes = input.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shape_ok {
        return Err(invalid());
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| invalid())
}

/// Same day next month, clamped to that month's last day.
fn add_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    let mut day = date.day();
    loop {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            return d;
        }
        day -= 1;
    }
}
