use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrackerError};

pub const TIME_FORMAT: &str = "%H:%M";

/// Placeholder shift recorded for day-off entries.
pub fn default_shift() -> (NaiveTime, NaiveTime) {
    (
        NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
    )
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).ok()
}

/// One day in the work log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorkEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub place: String,
    #[serde(default, with = "hh_mm")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "hh_mm")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_day_off: bool,
}

impl WorkEntry {
    pub(crate) fn from_shift(date: NaiveDate, shift: &ShiftInput) -> Result<Self> {
        let mut entry = Self {
            date,
            place: String::new(),
            start_time: None,
            end_time: None,
            is_day_off: false,
        };
        entry.apply(shift)?;
        Ok(entry)
    }

    /// Overwrites place/times from `shift`, validating before touching any field.
    pub(crate) fn apply(&mut self, shift: &ShiftInput) -> Result<()> {
        let (place, start, end) = shift.resolve()?;
        self.place = place;
        self.start_time = Some(start);
        self.end_time = Some(end);
        self.is_day_off = shift.is_day_off;
        Ok(())
    }

    /// Shift length; overnight shifts wrap past midnight. Day-off entries have none.
    pub fn hours_worked(&self) -> Option<Duration> {
        if self.is_day_off {
            return None;
        }
        let start = self.start_time?;
        let end = self.end_time?;
        let mut duration = end - start;
        if duration < Duration::zero() {
            duration = duration + Duration::hours(24);
        }
        Some(duration)
    }

    /// `09:00 - 17:00`, empty when either end is missing.
    pub fn time_range(&self) -> String {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => format!(
                "{} - {}",
                start.format(TIME_FORMAT),
                end.format(TIME_FORMAT)
            ),
            _ => String::new(),
        }
    }
}

/// Raw form input for a work log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftInput {
    #[serde(default)]
    pub place: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub is_day_off: bool,
}

impl ShiftInput {
    pub fn work(place: &str, start_time: &str, end_time: &str) -> Self {
        Self {
            place: place.to_string(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            is_day_off: false,
        }
    }

    pub fn day_off() -> Self {
        Self {
            is_day_off: true,
            ..Self::default()
        }
    }

    fn resolve(&self) -> Result<(String, NaiveTime, NaiveTime)> {
        if self.is_day_off {
            let (start, end) = default_shift();
            return Ok((String::new(), start, end));
        }
        let place = self.place.trim();
        if place.is_empty() {
            return Err(TrackerError::Validation("place of work is required".into()));
        }
        if self.start_time.trim().is_empty() || self.end_time.trim().is_empty() {
            return Err(TrackerError::Validation(
                "start and end time are required".into(),
            ));
        }
        let start = parse_time(&self.start_time).ok_or_else(|| {
            TrackerError::Validation(format!("invalid start time `{}`", self.start_time))
        })?;
        let end = parse_time(&self.end_time).ok_or_else(|| {
            TrackerError::Validation(format!("invalid end time `{}`", self.end_time))
        })?;
        Ok((place.to_string(), start, end))
    }
}

/// `HH:MM` strings on disk; an empty string means "not recorded".
mod hh_mm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{parse_time, TIME_FORMAT};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&time.format(TIME_FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if raw.trim().is_empty() {
            return Ok(None);
        }
        parse_time(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid time `{}`", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn entry(start: &str, end: &str) -> WorkEntry {
        WorkEntry::from_shift(date(), &ShiftInput::work("Office", start, end)).unwrap()
    }

    #[test]
    fn day_shift_hours() {
        assert_eq!(entry("09:00", "17:00").hours_worked(), Some(Duration::hours(8)));
    }

    #[test]
    fn overnight_shift_wraps() {
        assert_eq!(entry("22:00", "06:00").hours_worked(), Some(Duration::hours(8)));
    }

    #[test]
    fn day_off_forces_defaults_and_has_no_hours() {
        let shift = ShiftInput {
            place: "Ignored".into(),
            start_time: "nonsense".into(),
            end_time: "".into(),
            is_day_off: true,
        };
        let entry = WorkEntry::from_shift(date(), &shift).unwrap();
        assert_eq!(entry.place, "");
        assert_eq!(entry.time_range(), "09:00 - 17:00");
        assert_eq!(entry.hours_worked(), None);
    }

    #[test]
    fn work_shift_validation() {
        let missing_place = ShiftInput::work("  ", "09:00", "17:00");
        assert!(WorkEntry::from_shift(date(), &missing_place).is_err());
        let missing_time = ShiftInput::work("Office", "", "17:00");
        assert!(WorkEntry::from_shift(date(), &missing_time).is_err());
        let bad_time = ShiftInput::work("Office", "9am", "17:00");
        assert!(matches!(
            WorkEntry::from_shift(date(), &bad_time),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn persisted_format_uses_hh_mm_strings() {
        let json = serde_json::to_value(entry("08:30", "17:15")).unwrap();
        assert_eq!(json["Date"], "2024-03-04");
        assert_eq!(json["StartTime"], "08:30");
        assert_eq!(json["EndTime"], "17:15");

        let legacy: WorkEntry = serde_json::from_str(
            r#"{"Date":"2024-03-05","Place":"","StartTime":"","EndTime":"","IsDayOff":true}"#,
        )
        .unwrap();
        assert_eq!(legacy.start_time, None);
        assert!(legacy.is_day_off);
    }
}
