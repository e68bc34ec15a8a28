//! Filtering and pagination over the transaction log.

use chrono::NaiveDate;
use serde::Serialize;

use super::{ledger::Ledger, transaction::Transaction, transaction::TransactionKind};

/// Predicates applied by [`query`]; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    /// Inclusive lower bound on the transaction's calendar date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the transaction's calendar date.
    pub date_to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let date = transaction.date();
        self.kind.map_or(true, |kind| kind.matches(transaction))
            && self.date_from.map_or(true, |from| date >= from)
            && self.date_to.map_or(true, |to| date <= to)
    }
}

/// Matching transactions, most recent first; equal timestamps keep ledger order.
pub fn query(ledger: &Ledger, filter: &TransactionFilter) -> Vec<Transaction> {
    let mut matched: Vec<Transaction> = ledger
        .transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    matched
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Cuts a 1-indexed page out of `items`.
///
/// Pages below 1 resolve to the first page and pages past the end to the last one.
/// An empty input yields zero pages and no items.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));
    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    Page {
        items,
        page,
        page_size,
        total_items,
        total_pages,
    }
}
