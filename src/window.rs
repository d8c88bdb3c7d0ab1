use std::fmt;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Serialize, Serializer};

/// Inclusive range of calendar days a report run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("window start {start} is after window end {end}");
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// The full calendar month immediately preceding `today`.
pub fn last_month_window(today: NaiveDate) -> DateWindow {
    let first_this_month = first_of_month(today);
    let end = first_this_month - Duration::days(1);
    DateWindow {
        start: first_of_month(end),
        end,
    }
}

/// The last `n` calendar months including the current one, ending on `today`.
pub fn last_n_months_window(today: NaiveDate, n: u32) -> Result<DateWindow> {
    if n == 0 {
        bail!("month count must be at least 1");
    }
    let start = YearMonth::of(today)
        .months_back(n - 1)
        .and_then(YearMonth::first_day)
        .with_context(|| format!("cannot go back {n} months from {today}"))?;
    DateWindow::new(start, today)
}

/// Resolve the report window from optional explicit bounds, defaulting to the last full month.
pub fn resolve_report_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateWindow> {
    match (start, end) {
        (Some(start), Some(end)) => {
            DateWindow::new(start, end).context("invalid explicit report window")
        }
        (None, None) => Ok(last_month_window(today)),
        (Some(_), None) => bail!("--start requires --end"),
        (None, Some(_)) => bail!("--end requires --start"),
    }
}

/// Start of the intra-month week bucket: the 1st, 8th, 15th or 22nd.
pub fn week_bucket_start(date: NaiveDate) -> NaiveDate {
    let day = match date.day() {
        1..=7 => 1,
        8..=14 => 8,
        15..=21 => 15,
        _ => 22,
    };
    date.with_day(day).unwrap_or(date)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// `None` when the result falls outside the representable month range.
    pub fn months_back(self, n: u32) -> Option<Self> {
        let index = self
            .year
            .checked_mul(12)?
            .checked_add(self.month as i32 - 1)?
            .checked_sub(i32::try_from(n).ok()?)?;
        Some(Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        })
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
