//! Transaction log, derived balances, and listing helpers.

#[allow(clippy::module_inception)]
pub mod ledger;
pub mod query;
pub mod transaction;

pub use ledger::{Balances, Ledger};
pub use query::{paginate, query, Page, TransactionFilter};
pub use transaction::{
    Transaction, TransactionDraft, TransactionKind, MAX_AMOUNT, MAX_DESCRIPTION_LEN,
};
