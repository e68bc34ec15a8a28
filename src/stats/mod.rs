//! Period statistics over the ledger: totals, top transactions and daily charts.

pub mod engine;
pub mod period;

pub use engine::{
    compute_period, monthly_overview, ChartSeries, MonthlyOverview, PeriodStats, TopEntry,
    TOP_LIMIT,
};
pub use period::{Period, PeriodWindow};
