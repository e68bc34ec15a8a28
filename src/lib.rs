#![doc(test(attr(deny(warnings))))]

//! Finance Tracker keeps a multi-currency income/expense ledger and a work-shift log,
//! computes period statistics and timesheets, and serves them over a small JSON API.

pub mod calendar;
pub mod config;
pub mod core;
pub mod currency;
pub mod errors;
pub mod ledger;
pub mod server;
pub mod stats;
pub mod storage;
pub mod utils;
pub mod worklog;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Finance Tracker tracing initialized.");
    });
}
