//! Daily work-shift log, month summaries, and timesheet export.

pub mod entry;
pub mod summary;
pub mod timesheet;
pub mod work_log;

pub use entry::{default_shift, parse_time, ShiftInput, WorkEntry};
pub use summary::{credited_duration, MonthSummary, OvertimeAccounting};
pub use timesheet::{Timesheet, TimesheetRow};
pub use work_log::{WorkEntryView, WorkLog};
