use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entry::{ShiftInput, WorkEntry};
use crate::{
    calendar::{self, YearMonth},
    errors::{Result, TrackerError},
};

/// Work and day-off entries, at most one per calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkLog {
    #[serde(default)]
    pub entries: Vec<WorkEntry>,
}

/// Display row for the work log listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkEntryView {
    pub date: NaiveDate,
    pub formatted_date: String,
    pub place: String,
    pub time_range: String,
    pub is_day_off: bool,
    pub hours_worked: Option<String>,
}

impl WorkLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, date: NaiveDate, shift: &ShiftInput) -> Result<WorkEntry> {
        if self.entry(date).is_some() {
            return Err(TrackerError::Conflict(format!(
                "an entry for {} already exists",
                date
            )));
        }
        let entry = WorkEntry::from_shift(date, shift)?;
        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn edit_entry(&mut self, date: NaiveDate, shift: &ShiftInput) -> Result<WorkEntry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.date == date)
            .ok_or_else(|| TrackerError::NotFound(format!("no work log entry for {}", date)))?;
        entry.apply(shift)?;
        Ok(entry.clone())
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&WorkEntry> {
        self.entries.iter().find(|entry| entry.date == date)
    }

    /// Entries dated inside `month`, oldest first.
    pub fn entries_in_month(&self, month: YearMonth) -> Vec<&WorkEntry> {
        let mut entries: Vec<&WorkEntry> = self
            .entries
            .iter()
            .filter(|entry| month.contains(entry.date))
            .collect();
        entries.sort_by_key(|entry| entry.date);
        entries
    }

    /// All entries, newest first, formatted for display.
    pub fn listing(&self) -> Vec<WorkEntryView> {
        let mut views: Vec<WorkEntryView> = self
            .entries
            .iter()
            .map(|entry| WorkEntryView {
                date: entry.date,
                formatted_date: calendar::weekday_date(entry.date),
                place: entry.place.clone(),
                time_range: entry.time_range(),
                is_day_off: entry.is_day_off,
                hours_worked: entry
                    .hours_worked()
                    .map(|duration| format!("{:.1} h", duration.num_minutes() as f64 / 60.0)),
            })
            .collect();
        views.sort_by(|a, b| b.date.cmp(&a.date));
        views
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
