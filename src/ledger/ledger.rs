use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Local};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::transaction::{Transaction, TransactionDraft};
use crate::{
    currency::CurrencyCode,
    errors::{Result, TrackerError},
};

/// Per-currency signed totals, ordered by currency code.
pub type Balances = BTreeMap<CurrencyCode, Decimal>;

/// Ordered transaction log plus the balances derived from it.
///
/// Mutations leave `balances` stale until [`Ledger::recalculate`] runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ledger {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub balances: Balances,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transactions(transactions: Vec<Transaction>) -> Result<Self> {
        let mut ledger = Self {
            transactions,
            balances: Balances::new(),
        };
        ledger.recalculate()?;
        Ok(ledger)
    }

    pub fn add(&mut self, draft: TransactionDraft) -> Result<Transaction> {
        self.add_at(draft, Local::now().fixed_offset())
    }

    /// Appends a transaction stamped with `timestamp`.
    pub fn add_at(
        &mut self,
        draft: TransactionDraft,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<Transaction> {
        draft.validate()?;
        let transaction = draft.into_transaction(self.next_id(), timestamp);
        self.transactions.push(transaction.clone());
        Ok(transaction)
    }

    /// Replaces the fields of transaction `id`, keeping its timestamp and position.
    pub fn edit(&mut self, id: u64, draft: TransactionDraft) -> Result<Transaction> {
        let position = self.position(id)?;
        draft.validate()?;
        let transaction = &mut self.transactions[position];
        transaction.apply(draft);
        Ok(transaction.clone())
    }

    pub fn delete(&mut self, id: u64) -> Result<Transaction> {
        let position = self.position(id)?;
        Ok(self.transactions.remove(position))
    }

    /// Rebuilds balances from the transaction log, dropping zero totals.
    ///
    /// A currency whose total leaves the decimal range is an error and leaves
    /// the previous balances in place.
    pub fn recalculate(&mut self) -> Result<()> {
        let mut balances = Balances::new();
        for transaction in &self.transactions {
            let balance = balances
                .entry(transaction.currency.clone())
                .or_insert(Decimal::ZERO);
            *balance = balance
                .checked_add(transaction.signed_amount())
                .ok_or_else(|| {
                    TrackerError::Validation(format!(
                        "{} balance is out of range",
                        transaction.currency
                    ))
                })?;
        }
        balances.retain(|_, balance| !balance.is_zero());
        self.balances = balances;
        Ok(())
    }

    /// Balances as they should be after [`Ledger::recalculate`], without mutating.
    pub fn is_consistent(&self) -> bool {
        let mut expected = self.clone();
        expected.recalculate().is_ok() && expected.balances == self.balances
    }

    pub fn next_id(&self) -> u64 {
        self.transactions
            .iter()
            .map(|transaction| transaction.id)
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn transaction(&self, id: u64) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|transaction| transaction.id == id)
    }

    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    pub fn balance(&self, currency: &CurrencyCode) -> Decimal {
        self.balances.get(currency).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn position(&self, id: u64) -> Result<usize> {
        self.transactions
            .iter()
            .position(|transaction| transaction.id == id)
            .ok_or_else(|| TrackerError::NotFound(format!("transaction {} not found", id)))
    }
}
