//! Time windows scanned by the engine.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Utc};

/// Half-open range `[from, to)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        DateRange { from, to }
    }

    /// Sync window: the first day of the current month through the last day
    /// of next month, inclusive.
    pub fn sync_window(now: DateTime<Utc>) -> Self {
        Self::months_from_start_of_month(now, 2)
    }

    /// Window swept by the marker scrub: the current month and the eleven
    /// that follow.
    pub fn scrub_window(now: DateTime<Utc>) -> Self {
        Self::months_from_start_of_month(now, 12)
    }

    fn months_from_start_of_month(now: DateTime<Utc>, months: u32) -> Self {
        let first = first_of_month(now.date_naive());
        let end = first
            .checked_add_months(Months::new(months))
            .unwrap_or(NaiveDate::MAX);

        DateRange {
            from: first.and_time(NaiveTime::MIN).and_utc(),
            to: end.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
