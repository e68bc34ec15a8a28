use chrono::Utc;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info, warn};

use crate::{
    core::utils::{ensure_dir, write_atomic, PathResolver},
    errors::Result,
    ledger::Ledger,
    worklog::WorkLog,
};

use super::{
    migration::{migrate_ledger, migrate_work_log, MigrationReport},
    StorageBackend,
};

const BACKUP_PREFIX: &str = "finance_data_backup_";
const BACKUP_EXTENSION: &str = "json";
pub const DEFAULT_RETENTION: usize = 10;

/// JSON files in one data directory: the ledger, the work log and ledger backups.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    root: PathBuf,
    ledger_path: PathBuf,
    work_log_path: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let backups_dir = PathResolver::backup_dir_in(&app_root);
        ensure_dir(&backups_dir)?;
        Ok(Self {
            ledger_path: PathResolver::ledger_file_in(&app_root),
            work_log_path: PathResolver::work_log_file_in(&app_root),
            root: app_root,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None, None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    pub fn work_log_path(&self) -> &Path {
        &self.work_log_path
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Loads the ledger along with everything the legacy migration repaired.
    pub fn load_ledger_with_report(&self) -> Result<(Ledger, MigrationReport)> {
        if !self.ledger_path.exists() {
            info!(path = %self.ledger_path.display(), "ledger file absent; starting empty");
            return Ok((Ledger::new(), MigrationReport::default()));
        }
        let data = fs::read_to_string(&self.ledger_path)?;
        let (ledger, report) = migrate_ledger(&data)?;
        log_report("ledger", &report);
        info!(transactions = ledger.len(), "ledger loaded");
        Ok((ledger, report))
    }

    fn backup_existing_file(&self) -> Result<()> {
        if !self.ledger_path.exists() {
            return Ok(());
        }
        ensure_dir(&self.backups_dir)?;
        let backup_path = self.next_backup_path();
        fs::copy(&self.ledger_path, &backup_path)?;
        debug!(path = %backup_path.display(), "ledger backup written");
        self.prune_backups()
    }

    /// `finance_data_backup_<unix>.json`, suffixed when a backup for the same second exists.
    fn next_backup_path(&self) -> PathBuf {
        let stamp = Utc::now().timestamp();
        let mut path = self
            .backups_dir
            .join(format!("{}{}.{}", BACKUP_PREFIX, stamp, BACKUP_EXTENSION));
        let mut counter = 1;
        while path.exists() {
            path = self.backups_dir.join(format!(
                "{}{}_{}.{}",
                BACKUP_PREFIX, stamp, counter, BACKUP_EXTENSION
            ));
            counter += 1;
        }
        path
    }

    fn prune_backups(&self) -> Result<()> {
        let backups = self.list_backups()?;
        if backups.len() <= self.retention {
            return Ok(());
        }
        for path in backups.iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(path) {
                warn!(path = %path.display(), error = %err, "failed to remove old backup");
            }
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    fn load_ledger(&self) -> Result<Ledger> {
        self.load_ledger_with_report().map(|(ledger, _)| ledger)
    }

    fn save_ledger(&self, ledger: &Ledger) -> Result<()> {
        // Backups are best effort; the save itself must still land.
        if let Err(err) = self.backup_existing_file() {
            warn!(error = %err, "ledger backup failed; saving anyway");
        }
        let json = serde_json::to_string_pretty(ledger)?;
        write_atomic(&self.ledger_path, &json)?;
        debug!(transactions = ledger.len(), "ledger saved");
        Ok(())
    }

    fn load_work_log(&self) -> Result<WorkLog> {
        if !self.work_log_path.exists() {
            info!(path = %self.work_log_path.display(), "work log file absent; starting empty");
            return Ok(WorkLog::new());
        }
        let data = fs::read_to_string(&self.work_log_path)?;
        let (log, report) = migrate_work_log(&data)?;
        log_report("work log", &report);
        info!(entries = log.len(), "work log loaded");
        Ok(log)
    }

    fn save_work_log(&self, log: &WorkLog) -> Result<()> {
        let json = serde_json::to_string_pretty(log)?;
        write_atomic(&self.work_log_path, &json)?;
        debug!(entries = log.len(), "work log saved");
        Ok(())
    }

    fn list_backups(&self) -> Result<Vec<PathBuf>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.backups_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !is_backup_file(&path) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, path));
        }
        entries.sort_by(|a, b| b.cmp(a));
        Ok(entries.into_iter().map(|(_, path)| path).collect())
    }
}

fn is_backup_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.starts_with(BACKUP_PREFIX)
        && path.extension().and_then(|ext| ext.to_str()) == Some(BACKUP_EXTENSION)
}

fn log_report(file: &str, report: &MigrationReport) {
    for change in &report.changes {
        if matches!(change, super::MigrationChange::BalanceDrift { .. }) {
            warn!(file, "{}", change);
        } else {
            info!(file, "migrated: {}", change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionDraft;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn storage_with_temp_dir(retention: usize) -> (JsonStorage, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = JsonStorage::new(Some(temp.path().to_path_buf()), Some(retention))
            .expect("json storage");
        (storage, temp)
    }

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger
            .add(TransactionDraft::income(dec!(100), "Salary", "USD"))
            .expect("add");
        ledger.recalculate().unwrap();
        ledger
    }

    #[test]
    fn missing_files_load_empty() {
        let (storage, _guard) = storage_with_temp_dir(3);
        assert!(storage.load_ledger().expect("ledger").is_empty());
        assert!(storage.load_work_log().expect("work log").is_empty());
        assert!(storage.list_backups().expect("backups").is_empty());
    }

    #[test]
    fn failed_backup_does_not_block_the_save() {
        let (storage, _guard) = storage_with_temp_dir(3);
        storage.save_ledger(&sample_ledger()).expect("first save");
        fs::remove_dir_all(storage.backups_dir()).unwrap();
        fs::write(storage.backups_dir(), "not a directory").unwrap();

        let mut ledger = sample_ledger();
        ledger
            .add(TransactionDraft::expense(dec!(30), "Taxi", "USD"))
            .expect("add");
        ledger.recalculate().unwrap();
        storage.save_ledger(&ledger).expect("save despite backup failure");
        assert_eq!(storage.load_ledger().expect("load ledger"), ledger);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (storage, _guard) = storage_with_temp_dir(3);
        let ledger = sample_ledger();
        storage.save_ledger(&ledger).expect("save ledger");
        let loaded = storage.load_ledger().expect("load ledger");
        assert_eq!(loaded, ledger);
        assert!(!crate::core::utils::tmp_path(storage.ledger_path()).exists());
    }

    #[test]
    fn first_save_creates_no_backup() {
        let (storage, _guard) = storage_with_temp_dir(3);
        storage.save_ledger(&sample_ledger()).expect("save");
        assert!(storage.list_backups().expect("list").is_empty());
        storage.save_ledger(&sample_ledger()).expect("save again");
        assert_eq!(storage.list_backups().expect("list").len(), 1);
    }

    #[test]
    fn backup_names_follow_pattern() {
        let (storage, _guard) = storage_with_temp_dir(3);
        storage.save_ledger(&sample_ledger()).expect("save");
        storage.save_ledger(&sample_ledger()).expect("save");
        let backups = storage.list_backups().expect("list");
        let name = backups[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("finance_data_backup_"));
        assert!(name.ends_with(".json"));
    }
}
