#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, FixedOffset, TimeZone};
use finance_tracker::{
    config::AppConfig,
    server::{app_router, build_state},
    storage::JsonStorage,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A fresh data directory that outlives the calling test.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn setup_storage(retention: usize) -> (Arc<JsonStorage>, PathBuf) {
    let base = temp_base();
    let storage =
        JsonStorage::new(Some(base.clone()), Some(retention)).expect("create json storage");
    (Arc::new(storage), base)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        static_dir: None,
        ..AppConfig::default()
    }
}

/// Router over an empty data directory with default credentials.
pub fn setup_router() -> (Router, PathBuf) {
    let (storage, base) = setup_storage(3);
    let config = test_config();
    let state = build_state(&config, storage).expect("build app state");
    (app_router(state, &config), base)
}

pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", user, password)))
}

/// Local time at UTC+3 on the given day and hour.
pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(3 * 3600)
        .unwrap()
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .unwrap()
}
