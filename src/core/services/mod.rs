pub mod finance_service;
pub mod worklog_service;

pub use finance_service::{FinanceService, TransactionListing};
pub use worklog_service::{PdfExport, WorkLogService};
