//! Transaction bookkeeping shared by every request handler.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    currency::{CurrencyCode, RateTable},
    errors::Result,
    ledger::{
        paginate, query, Balances, Ledger, Page, Transaction, TransactionDraft,
        TransactionFilter,
    },
    stats::{compute_period, monthly_overview, MonthlyOverview, Period, PeriodStats},
    storage::StorageBackend,
};

/// One page of the transaction listing plus the current balances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionListing {
    #[serde(flatten)]
    pub page: Page<Transaction>,
    pub balances: Balances,
}

/// Owns the ledger; every mutation is validated, applied, rebalanced and persisted
/// while the lock is held.
pub struct FinanceService {
    ledger: Mutex<Ledger>,
    storage: Arc<dyn StorageBackend>,
    rates: RateTable,
    page_size: usize,
}

impl FinanceService {
    pub fn new(
        ledger: Ledger,
        storage: Arc<dyn StorageBackend>,
        rates: RateTable,
        page_size: usize,
    ) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            storage,
            rates,
            page_size: page_size.max(1),
        }
    }

    /// Builds the service from whatever the backend currently holds.
    pub fn load(
        storage: Arc<dyn StorageBackend>,
        rates: RateTable,
        page_size: usize,
    ) -> Result<Self> {
        let ledger = storage.load_ledger()?;
        Ok(Self::new(ledger, storage, rates, page_size))
    }

    // A poisoned ledger is still whole: mutations only ever swap in a finished copy.
    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `operation` to a working copy and swaps it in only once balances
    /// recalculate cleanly.
    fn mutate<T>(&self, operation: impl FnOnce(&mut Ledger) -> Result<T>) -> Result<T> {
        let mut ledger = self.lock();
        let mut working = ledger.clone();
        let value = operation(&mut working)?;
        working.recalculate()?;
        *ledger = working;
        if let Err(err) = self.storage.save_ledger(&ledger) {
            error!(error = %err, "failed to persist ledger; change kept in memory");
            return Err(err);
        }
        Ok(value)
    }

    pub fn add_transaction(&self, draft: TransactionDraft) -> Result<Transaction> {
        self.add_transaction_at(draft, Local::now().fixed_offset())
    }

    pub fn add_transaction_at(
        &self,
        draft: TransactionDraft,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<Transaction> {
        let transaction = self.mutate(|ledger| ledger.add_at(draft, timestamp))?;
        info!(id = transaction.id, currency = %transaction.currency, "transaction added");
        Ok(transaction)
    }

    pub fn edit_transaction(&self, id: u64, draft: TransactionDraft) -> Result<Transaction> {
        let transaction = self.mutate(|ledger| ledger.edit(id, draft))?;
        info!(id, "transaction updated");
        Ok(transaction)
    }

    pub fn delete_transaction(&self, id: u64) -> Result<Transaction> {
        let transaction = self.mutate(|ledger| ledger.delete(id))?;
        info!(id, "transaction deleted");
        Ok(transaction)
    }

    pub fn transaction(&self, id: u64) -> Option<Transaction> {
        self.lock().transaction(id).cloned()
    }

    pub fn list(&self, filter: &TransactionFilter, page: usize) -> TransactionListing {
        let ledger = self.lock();
        TransactionListing {
            page: paginate(query(&ledger, filter), page, self.page_size),
            balances: ledger.balances().clone(),
        }
    }

    pub fn balances(&self) -> Balances {
        self.lock().balances().clone()
    }

    pub fn balance(&self, currency: &CurrencyCode) -> Decimal {
        self.lock().balance(currency)
    }

    pub fn overview(&self, now: DateTime<FixedOffset>) -> Result<MonthlyOverview> {
        monthly_overview(&self.lock(), &self.rates, now)
    }

    pub fn period_stats(&self, period: Period, anchor: NaiveDate) -> Result<PeriodStats> {
        compute_period(&self.lock(), period, anchor)
    }

    pub fn snapshot(&self) -> Ledger {
        self.lock().clone()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::TrackerError, storage::JsonStorage, worklog::WorkLog};
    use rust_decimal_macros::dec;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct ReadOnlyStorage;

    impl StorageBackend for ReadOnlyStorage {
        fn load_ledger(&self) -> Result<Ledger> {
            Ok(Ledger::new())
        }

        fn save_ledger(&self, _ledger: &Ledger) -> Result<()> {
            Err(TrackerError::Persistence("disk is read-only".into()))
        }

        fn load_work_log(&self) -> Result<WorkLog> {
            Ok(WorkLog::new())
        }

        fn save_work_log(&self, _log: &WorkLog) -> Result<()> {
            Err(TrackerError::Persistence("disk is read-only".into()))
        }

        fn list_backups(&self) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }
    }

    fn service() -> (FinanceService, Arc<JsonStorage>, TempDir) {
        let temp = TempDir::new().expect("temp dir");
        let storage = Arc::new(
            JsonStorage::new(Some(temp.path().to_path_buf()), Some(3)).expect("storage"),
        );
        let service = FinanceService::new(Ledger::new(), storage.clone(), RateTable::standard(), 2);
        (service, storage, temp)
    }

    #[test]
    fn mutations_rebalance_and_persist() {
        let (service, storage, _guard) = service();
        let usd = CurrencyCode::new("USD");
        let income = service
            .add_transaction(TransactionDraft::income(dec!(100), "Salary", "usd"))
            .unwrap();
        service
            .add_transaction(TransactionDraft::expense(dec!(30), "Food", "USD"))
            .unwrap();
        assert_eq!(service.balance(&usd), dec!(70));

        service.delete_transaction(income.id).unwrap();
        assert_eq!(service.balance(&usd), dec!(-30));

        let stored = storage.load_ledger().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.balance(&usd), dec!(-30));
    }

    #[test]
    fn failed_validation_changes_nothing() {
        let (service, _storage, _guard) = service();
        let before = service.snapshot();
        let err = service
            .add_transaction(TransactionDraft::expense(dec!(0), "Nothing", "BYN"))
            .expect_err("zero amount");
        assert!(matches!(err, TrackerError::Validation(_)));
        assert!(matches!(
            service.edit_transaction(42, TransactionDraft::expense(dec!(1), "x", "BYN")),
            Err(TrackerError::NotFound(_))
        ));
        assert_eq!(service.snapshot(), before);
    }

    #[test]
    fn listing_pages_with_configured_size() {
        let (service, _storage, _guard) = service();
        for n in 1..=5 {
            service
                .add_transaction(TransactionDraft::expense(
                    Decimal::from(n),
                    format!("item {}", n),
                    "BYN",
                ))
                .unwrap();
        }
        let listing = service.list(&TransactionFilter::default(), 3);
        assert_eq!(listing.page.total_pages, 3);
        assert_eq!(listing.page.items.len(), 1);
        assert_eq!(listing.balances.get(&CurrencyCode::base()), Some(&dec!(-15)));
    }

    #[test]
    fn persistence_failure_is_reported_but_change_is_kept() {
        let service =
            FinanceService::new(Ledger::new(), Arc::new(ReadOnlyStorage), RateTable::standard(), 10);
        let err = service
            .add_transaction(TransactionDraft::income(dec!(5), "Tip", "BYN"))
            .expect_err("save must fail");
        assert!(matches!(err, TrackerError::Persistence(_)));
        assert_eq!(service.balance(&CurrencyCode::base()), dec!(5));
        assert!(service.snapshot().is_consistent());
    }

    #[test]
    fn balance_overflow_rolls_back_the_mutation() {
        let mut seeded = Ledger::new();
        seeded
            .add(TransactionDraft::income(dec!(1), "Seed", "BYN"))
            .unwrap();
        // Legacy files are not bound by the amount limit.
        seeded.transactions[0].amount = Decimal::MAX;
        seeded.recalculate().unwrap();

        let temp = TempDir::new().expect("temp dir");
        let storage =
            Arc::new(JsonStorage::new(Some(temp.path().to_path_buf()), Some(3)).expect("storage"));
        let service = FinanceService::new(seeded.clone(), storage.clone(), RateTable::standard(), 10);

        let err = service
            .add_transaction(TransactionDraft::income(dec!(5), "Tip", "BYN"))
            .expect_err("balance overflow");
        assert!(matches!(err, TrackerError::Validation(_)));
        assert_eq!(service.snapshot(), seeded);
        assert!(storage.load_ledger().unwrap().is_empty());

        let refund = service
            .add_transaction(TransactionDraft::expense(dec!(5), "Refund", "BYN"))
            .unwrap();
        assert_eq!(refund.id, 2);
        assert_eq!(service.balance(&CurrencyCode::base()), Decimal::MAX - dec!(5));
    }
}
