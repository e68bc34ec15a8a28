use std::{fmt, str::FromStr};

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
    calendar::{self, YearMonth},
    errors::{Result, TrackerError},
};

/// Aggregation window size for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    #[default]
    Month,
}

impl Period {
    /// Reads the anchor date for this period; month periods also accept `YYYY-MM`.
    /// A missing anchor means `today`.
    pub fn parse_anchor(self, raw: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
        let raw = match raw.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value,
            None => return Ok(today),
        };
        let parsed = match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) if self == Period::Month => {
                raw.parse::<YearMonth>().ok().map(|month| month.first_day())
            }
            Err(_) => None,
        };
        let anchor = parsed.ok_or_else(|| {
            TrackerError::Validation(format!("invalid date `{}` for {} period", raw, self))
        })?;
        PeriodWindow::resolve(self, anchor)?;
        Ok(anchor)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        };
        f.write_str(label)
    }
}

impl FromStr for Period {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "" | "month" => Ok(Period::Month),
            other => Err(TrackerError::Validation(format!(
                "unknown period `{}`",
                other
            ))),
        }
    }
}

/// Date range `[start, end)` a period covers, anchored on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub period: Period,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PeriodWindow {
    /// Fails when the window would reach past the representable date range.
    pub fn resolve(period: Period, anchor: NaiveDate) -> Result<Self> {
        let bounds = match period {
            Period::Day => anchor
                .checked_add_days(Days::new(1))
                .map(|end| (anchor, end)),
            Period::Week => calendar::week_start(anchor).and_then(|start| {
                start
                    .checked_add_days(Days::new(7))
                    .map(|end| (start, end))
            }),
            Period::Month => anchor.with_day(1).and_then(|start| {
                start
                    .checked_add_months(Months::new(1))
                    .map(|end| (start, end))
            }),
        };
        let (start, end) = bounds.ok_or_else(|| {
            TrackerError::Validation(format!("no {} window around {}", period, anchor))
        })?;
        Ok(Self { period, start, end })
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Inclusive on both ends: a timestamp at exactly `end` midnight still matches.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        timestamp >= self.start.and_time(NaiveTime::MIN)
            && timestamp <= self.end.and_time(NaiveTime::MIN)
    }

    /// Chart buckets: one per day from `start` through `end` for weeks and months,
    /// a single bucket for a day.
    pub fn bucket_dates(&self) -> Vec<NaiveDate> {
        match self.period {
            Period::Day => vec![self.start],
            Period::Week | Period::Month => self
                .start
                .iter_days()
                .take_while(|day| *day <= self.end)
                .collect(),
        }
    }

    /// Human readable description of the window.
    pub fn label(&self) -> String {
        match self.period {
            Period::Day => calendar::long_date(self.start),
            Period::Week => format!(
                "{} {} – {} {} {}",
                self.start.day(),
                calendar::month_name(self.start.month()),
                self.end.day(),
                calendar::month_name(self.end.month()),
                self.end.year()
            ),
            Period::Month => YearMonth::of(self.start).label(),
        }
    }
}
