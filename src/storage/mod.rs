pub mod json_backend;
pub mod migration;

use std::path::PathBuf;

use crate::{errors::Result, ledger::Ledger, worklog::WorkLog};

/// Abstraction over persistence backends for the ledger and the work log.
pub trait StorageBackend: Send + Sync {
    /// Loads the ledger with freshly recalculated balances; a missing file is an empty ledger.
    fn load_ledger(&self) -> Result<Ledger>;
    fn save_ledger(&self, ledger: &Ledger) -> Result<()>;
    fn load_work_log(&self) -> Result<WorkLog>;
    fn save_work_log(&self, log: &WorkLog) -> Result<()>;
    /// Ledger backups, newest first.
    fn list_backups(&self) -> Result<Vec<PathBuf>>;
}

pub use json_backend::{JsonStorage, DEFAULT_RETENTION};
pub use migration::{migrate_ledger, migrate_work_log, MigrationChange, MigrationReport};
