use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use tracing::{error, info};

use crate::{
    calendar::YearMonth,
    errors::Result,
    storage::StorageBackend,
    worklog::{
        MonthSummary, OvertimeAccounting, ShiftInput, Timesheet, WorkEntry, WorkEntryView,
        WorkLog,
    },
};

/// A rendered timesheet ready to be sent as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Owns the work log and persists it after every change.
pub struct WorkLogService {
    log: Mutex<WorkLog>,
    storage: Arc<dyn StorageBackend>,
    policy: OvertimeAccounting,
}

impl WorkLogService {
    pub fn new(
        log: WorkLog,
        storage: Arc<dyn StorageBackend>,
        policy: OvertimeAccounting,
    ) -> Self {
        Self {
            log: Mutex::new(log),
            storage,
            policy,
        }
    }

    pub fn load(storage: Arc<dyn StorageBackend>, policy: OvertimeAccounting) -> Result<Self> {
        let log = storage.load_work_log()?;
        Ok(Self::new(log, storage, policy))
    }

    fn lock(&self) -> MutexGuard<'_, WorkLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<T>(&self, operation: impl FnOnce(&mut WorkLog) -> Result<T>) -> Result<T> {
        let mut log = self.lock();
        let value = operation(&mut log)?;
        if let Err(err) = self.storage.save_work_log(&log) {
            error!(error = %err, "failed to persist work log; change kept in memory");
            return Err(err);
        }
        Ok(value)
    }

    pub fn add_entry(&self, date: NaiveDate, shift: &ShiftInput) -> Result<WorkEntry> {
        let entry = self.mutate(|log| log.add_entry(date, shift))?;
        info!(%date, day_off = entry.is_day_off, "work log entry added");
        Ok(entry)
    }

    pub fn edit_entry(&self, date: NaiveDate, shift: &ShiftInput) -> Result<WorkEntry> {
        let entry = self.mutate(|log| log.edit_entry(date, shift))?;
        info!(%date, "work log entry updated");
        Ok(entry)
    }

    pub fn entry(&self, date: NaiveDate) -> Option<WorkEntry> {
        self.lock().entry(date).cloned()
    }

    pub fn listing(&self) -> Vec<WorkEntryView> {
        self.lock().listing()
    }

    pub fn month_summary(&self, month: YearMonth) -> MonthSummary {
        self.lock().month_summary(month, self.policy)
    }

    pub fn timesheet(&self, month: YearMonth) -> Result<Timesheet> {
        Timesheet::for_month(&self.lock(), month, self.policy)
    }

    /// Renders the month's timesheet outside the lock.
    pub fn export_pdf(&self, month: YearMonth) -> Result<PdfExport> {
        let sheet = self.timesheet(month)?;
        let bytes = sheet.render_pdf()?;
        info!(%month, rows = sheet.rows.len(), "timesheet exported");
        Ok(PdfExport {
            file_name: sheet.file_name(),
            bytes,
        })
    }

    pub fn policy(&self) -> OvertimeAccounting {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::TrackerError, storage::JsonStorage};
    use tempfile::TempDir;

    fn service(policy: OvertimeAccounting) -> (WorkLogService, Arc<JsonStorage>, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage =
            Arc::new(JsonStorage::new(Some(temp.path().to_path_buf()), None).expect("storage"));
        (
            WorkLogService::new(WorkLog::new(), storage.clone(), policy),
            storage,
            temp,
        )
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn entries_persist_and_reload() {
        let (service, storage, _guard) = service(OvertimeAccounting::AddOnTop);
        service
            .add_entry(date(4), &ShiftInput::work("Office", "09:00", "17:00"))
            .unwrap();
        service.add_entry(date(5), &ShiftInput::day_off()).unwrap();
        service
            .edit_entry(date(4), &ShiftInput::work("Office", "08:00", "17:00"))
            .unwrap();

        let reloaded = WorkLogService::load(storage, OvertimeAccounting::AddOnTop).unwrap();
        assert_eq!(reloaded.listing().len(), 2);
        assert_eq!(reloaded.entry(date(4)).unwrap().time_range(), "08:00 - 17:00");
    }

    #[test]
    fn duplicate_date_is_a_conflict() {
        let (service, _storage, _guard) = service(OvertimeAccounting::AddOnTop);
        service.add_entry(date(4), &ShiftInput::day_off()).unwrap();
        assert!(matches!(
            service.add_entry(date(4), &ShiftInput::day_off()),
            Err(TrackerError::Conflict(_))
        ));
    }

    #[test]
    fn summary_uses_configured_policy() {
        let (service, _storage, _guard) = service(OvertimeAccounting::IncludedInTotal);
        service
            .add_entry(date(4), &ShiftInput::work("Site", "07:00", "19:00"))
            .unwrap();
        let summary = service.month_summary(YearMonth::new(2024, 3).unwrap());
        assert_eq!(summary.total_with_overtime, 11.0);
        assert_eq!(summary.overtime_hours, 3.0);
    }

    #[test]
    fn export_names_file_after_month() {
        let (service, _storage, _guard) = service(OvertimeAccounting::AddOnTop);
        service
            .add_entry(date(4), &ShiftInput::work("Office", "09:00", "17:00"))
            .unwrap();
        let export = service.export_pdf(YearMonth::new(2024, 3).unwrap()).unwrap();
        assert_eq!(export.file_name, "worklog_2024-03.pdf");
        assert!(export.bytes.starts_with(b"%PDF"));
        assert!(matches!(
            service.export_pdf(YearMonth::new(2024, 4).unwrap()),
            Err(TrackerError::NotFound(_))
        ));
    }
}
