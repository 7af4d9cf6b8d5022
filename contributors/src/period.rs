use crate::api::{Error, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static MONTH_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^20[12]\d-(0[1-9]|1[0-2])$").expect("month regex is valid"));

/// Checks whether the input is a month in the `YYYY-MM` format, between 2010 and 2029.
pub fn is_valid_month(input: &str) -> bool {
    MONTH_FORMAT.is_match(input)
}

/// Calendar month, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn days(&self) -> u32 {
        match self.month {
            4 | 6 | 9 | 11 => 30,
            2 if is_leap_year(self.year) => 29,
            2 => 28,
            _ => 31,
        }
    }

    /// Date of the given day of this month.
    pub fn day(&self, day: u32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
            .ok_or_else(|| Error::InternalInvariant(format!("day {} does not exist in {}", day, self)))
    }

    /// First to last day of the month.
    pub fn range(&self) -> Result<DateRange> {
        DateRange::new(self.day(1)?, self.day(self.days())?)
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl FromStr for Month {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        if !is_valid_month(value) {
            return Err(Error::InputInvalid(format!(
                "\"{}\" is not a valid month (should be \"YYYY-MM\" and later than 2010)",
                value
            )));
        }
        let (year, month) = value.split_at(4);
        let year = year.parse::<i32>().map_err(anyhow::Error::from)?;
        let month = month.trim_start_matches('-').parse::<u32>().map_err(anyhow::Error::from)?;
        Ok(Month { year, month })
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<NaiveDate> for Month {
    fn from(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Inclusive range of days, within a single month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InputInvalid(format!("{} is after {}", start, end)));
        }
        if (start.year(), start.month()) != (end.year(), end.month()) {
            return Err(Error::InputInvalid(format!("{} and {} are not in the same month", start, end)));
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Formats as the `created:` qualifier of a search query expects it.
impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}
