use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::{
    core::utils::{ensure_dir, write_atomic, PathResolver},
    errors::Result,
    storage::DEFAULT_RETENTION,
    worklog::OvertimeAccounting,
};

pub const ADDR_ENV: &str = "FINANCE_TRACKER_ADDR";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const SESSION_COOKIE: &str = "auth_token";

/// Runtime settings read from `config.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    pub page_size: usize,
    pub backup_retention: usize,
    pub username: String,
    pub password: String,
    /// Value of the `auth_token` cookie handed out after a successful login.
    pub session_token: String,
    pub overtime_accounting: OvertimeAccounting,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8088".into(),
            page_size: DEFAULT_PAGE_SIZE,
            backup_retention: DEFAULT_RETENTION,
            username: "boss".into(),
            password: "0162".into(),
            session_token: "my-secret-token-123".into(),
            overtime_accounting: OvertimeAccounting::default(),
            static_dir: Some(PathBuf::from("static")),
        }
    }
}

impl AppConfig {
    /// Applies `FINANCE_TRACKER_ADDR` when set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(addr) = env::var(ADDR_ENV) {
            if !addr.trim().is_empty() {
                self.listen_addr = addr.trim().to_string();
            }
        }
        self
    }
}

pub struct ConfigManager {
    base: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
            base,
        })
    }

    /// Defaults when the file does not exist yet.
    pub fn load(&self) -> Result<AppConfig> {
        if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            info!(path = %self.path.display(), "no config file; using defaults");
            Ok(AppConfig::default())
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }
}
