use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{entry::WorkEntry, work_log::WorkLog};
use crate::calendar::YearMonth;

/// Shifts longer than this get the lunch break deducted.
pub const LUNCH_THRESHOLD_HOURS: i64 = 7;
pub const LUNCH_BREAK_HOURS: i64 = 1;
/// Credited hours beyond this count as overtime.
pub const REGULAR_DAY_HOURS: i64 = 8;

/// How `total_with_overtime` treats overtime that is already part of `total_hours`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OvertimeAccounting {
    /// `total_hours + overtime_hours`; overtime is counted twice.
    #[default]
    AddOnTop,
    /// `total_hours`; overtime is reported separately only.
    IncludedInTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthSummary {
    pub month: YearMonth,
    pub work_days: usize,
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub total_with_overtime: f64,
}

/// Shift length after the lunch deduction.
pub fn credited_duration(raw: Duration) -> Duration {
    if raw > Duration::hours(LUNCH_THRESHOLD_HOURS) {
        raw - Duration::hours(LUNCH_BREAK_HOURS)
    } else {
        raw
    }
}

pub fn overtime(credited: Duration) -> Duration {
    let regular = Duration::hours(REGULAR_DAY_HOURS);
    if credited > regular {
        credited - regular
    } else {
        Duration::zero()
    }
}

pub fn hours(duration: Duration) -> f64 {
    duration.num_minutes() as f64 / 60.0
}

impl WorkLog {
    pub fn month_summary(&self, month: YearMonth, policy: OvertimeAccounting) -> MonthSummary {
        summarize(month, self.entries_in_month(month), policy)
    }
}

pub(crate) fn summarize<'a>(
    month: YearMonth,
    entries: impl IntoIterator<Item = &'a WorkEntry>,
    policy: OvertimeAccounting,
) -> MonthSummary {
    let mut work_days = 0;
    let mut total = Duration::zero();
    let mut extra = Duration::zero();
    for raw in entries.into_iter().filter_map(WorkEntry::hours_worked) {
        let credited = credited_duration(raw);
        work_days += 1;
        total = total + credited;
        extra = extra + overtime(credited);
    }
    let total_hours = hours(total);
    let overtime_hours = hours(extra);
    let total_with_overtime = match policy {
        OvertimeAccounting::AddOnTop => total_hours + overtime_hours,
        OvertimeAccounting::IncludedInTotal => total_hours,
    };
    MonthSummary {
        month,
        work_days,
        total_hours,
        overtime_hours,
        total_with_overtime,
    }
}
