//! Calendar month handling: parsing the `YYYY_MM` command line form, day counts
//! and the "last month" default.

use chrono::{Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonthParseError {
    #[error("Expected a month like 2017_02 or 2017-02, got '{0}'")]
    Format(String),

    #[error("Month {month} out of range in '{input}'")]
    OutOfRange { input: String, month: u32 },
}

/// A calendar month, stored as (year, month).
///
/// # Examples
///
/// ```
/// use sgmet::Month;
///
/// let month: Month = "2017_02".parse().unwrap();
/// assert_eq!(month, Month(2017, 2));
/// assert_eq!(month.to_string(), "2017-02");
/// assert_eq!(month.days(), 28);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Month(pub i32, pub u32);

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self(year, month))
    }

    pub fn year(self) -> i32 {
        self.0
    }

    pub fn month(self) -> u32 {
        self.1
    }

    /// The calendar month before the one containing today's local date.
    pub fn last_month() -> Self {
        Self::preceding(Local::now().date_naive())
    }

    pub(crate) fn preceding(date: NaiveDate) -> Self {
        let previous = date.checked_sub_months(Months::new(1)).unwrap_or(date);
        Self(previous.year(), previous.month())
    }

    /// Number of days in the month, leap years included.
    pub fn days(self) -> u32 {
        days_in_month(self.0, self.1).unwrap_or(0)
    }

    /// Midnight at the start of the first day.
    pub fn first_instant(self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.0, self.1, 1)?.and_hms_opt(0, 0, 0)
    }

    pub fn contains(self, datetime: NaiveDateTime) -> bool {
        datetime.year() == self.0 && datetime.month() == self.1
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.0, self.1)
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once(['_', '-'])
            .ok_or_else(|| MonthParseError::Format(s.to_string()))?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(MonthParseError::Format(s.to_string()));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| MonthParseError::Format(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| MonthParseError::Format(s.to_string()))?;
        Month::new(year, month).ok_or(MonthParseError::OutOfRange {
            input: s.to_string(),
            month,
        })
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_month_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    let first_day_of_next_month = NaiveDate::from_ymd_opt(next_month_year, next_month, 1)?;
    let last_day_of_current_month = first_day_of_next_month - Duration::days(1);
    Some(last_day_of_current_month.day())
}
