use crate::types::month::Month;
use crate::types::variable::Variable;
use chrono::{Duration, NaiveDateTime};

/// The instants at which a month is queried for one variable.
///
/// Starts at midnight on the first of the month and steps by the variable's
/// sampling interval, ending one interval past the month's last instant so a
/// reading reported just after midnight is not lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampGrid {
    start: NaiveDateTime,
    interval: Duration,
    len: usize,
}

impl TimestampGrid {
    pub fn for_month(variable: Variable, month: Month) -> Option<Self> {
        let start = month.first_instant()?;
        let interval = variable.sampling_interval();
        let per_day = Duration::days(1).num_minutes() / interval.num_minutes();
        let len = (i64::from(month.days()) * per_day + 1) as usize;
        Some(Self {
            start,
            interval,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn iter(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.len).map(move |i| self.start + self.interval * i as i32)
    }
}
