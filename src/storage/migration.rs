//! One-time normalisation of ledger and work log files written by older versions.
//!
//! Files are parsed into permissive raw records first, every repair is recorded in a
//! [`MigrationReport`], and only then converted into the strict domain types.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt,
};

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    currency::CurrencyCode,
    errors::Result,
    ledger::{Balances, Ledger, Transaction},
    worklog::{WorkEntry, WorkLog},
};

/// Descriptions or categories containing one of these mark salary income.
pub const SALARY_MARKERS: [&str; 6] = ["salary", "payroll", "wage", "зарплата", "зп", "аванс"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationChange {
    /// Scalar `Balance` from single-currency files, moved into the base currency.
    LegacyBalance { amount: Decimal },
    NegativeAmount { id: u64 },
    SalaryForcedIncome { id: u64 },
    DirectionFromSign { id: u64 },
    DefaultCurrency { id: u64 },
    TagsCleaned { id: u64 },
    MissingTimestamp { id: u64 },
    ZeroAmountDropped { id: Option<u64> },
    IdReassigned { from: Option<u64>, to: u64 },
    /// Stored balances disagreed with the recalculated ones.
    BalanceDrift { currency: CurrencyCode, stored: Decimal, actual: Decimal },
    DuplicateWorkDate { date: NaiveDate },
}

impl fmt::Display for MigrationChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationChange::LegacyBalance { amount } => {
                write!(f, "legacy balance {} moved to base currency", amount)
            }
            MigrationChange::NegativeAmount { id } => {
                write!(f, "transaction {} had a negative amount; now an expense", id)
            }
            MigrationChange::SalaryForcedIncome { id } => {
                write!(f, "transaction {} looks like salary; marked as income", id)
            }
            MigrationChange::DirectionFromSign { id } => {
                write!(f, "transaction {} had no direction; taken from its sign", id)
            }
            MigrationChange::DefaultCurrency { id } => {
                write!(f, "transaction {} had no currency; set to base", id)
            }
            MigrationChange::TagsCleaned { id } => write!(f, "transaction {} tags trimmed", id),
            MigrationChange::MissingTimestamp { id } => {
                write!(f, "transaction {} had no timestamp", id)
            }
            MigrationChange::ZeroAmountDropped { id } => match id {
                Some(id) => write!(f, "transaction {} with zero amount dropped", id),
                None => f.write_str("transaction with zero amount dropped"),
            },
            MigrationChange::IdReassigned { from, to } => match from {
                Some(from) => write!(f, "duplicate id {} reassigned to {}", from, to),
                None => write!(f, "missing id assigned {}", to),
            },
            MigrationChange::BalanceDrift {
                currency,
                stored,
                actual,
            } => write!(
                f,
                "stored {} balance {} differs from recalculated {}",
                currency, stored, actual
            ),
            MigrationChange::DuplicateWorkDate { date } => {
                write!(f, "duplicate work log entry for {} dropped", date)
            }
        }
    }
}

/// Everything the migration pass changed while loading a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub changes: Vec<MigrationChange>,
}

impl MigrationReport {
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn has_drift(&self) -> bool {
        self.changes
            .iter()
            .any(|change| matches!(change, MigrationChange::BalanceDrift { .. }))
    }

    fn push(&mut self, change: MigrationChange) {
        self.changes.push(change);
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawLedger {
    #[serde(default)]
    transactions: Option<Vec<RawTransaction>>,
    #[serde(default)]
    balances: Option<BTreeMap<String, Decimal>>,
    #[serde(default)]
    balance: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawTransaction {
    #[serde(rename = "ID", default)]
    id: Option<i64>,
    #[serde(default)]
    amount: Decimal,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "DateTime", default)]
    timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    is_positive: Option<bool>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawWorkLog {
    #[serde(default)]
    entries: Option<Vec<WorkEntry>>,
}

pub fn is_salary(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SALARY_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Parses a ledger file, repairs legacy records and recalculates balances.
pub fn migrate_ledger(data: &str) -> Result<(Ledger, MigrationReport)> {
    let raw: RawLedger = serde_json::from_str(data)?;
    let mut report = MigrationReport::default();

    let mut kept: Vec<(Option<u64>, Transaction)> = Vec::new();
    for record in raw.transactions.unwrap_or_default() {
        let original_id = record.id.and_then(|id| u64::try_from(id).ok()).filter(|id| *id > 0);
        let label = original_id.unwrap_or(0);

        if record.amount.is_zero() {
            report.push(MigrationChange::ZeroAmountDropped { id: original_id });
            continue;
        }
        let mut amount = record.amount;
        let mut is_positive = match record.is_positive {
            Some(value) => value,
            None => {
                report.push(MigrationChange::DirectionFromSign { id: label });
                amount.is_sign_positive()
            }
        };
        if amount.is_sign_negative() {
            amount = amount.abs();
            if record.is_positive.is_some() {
                report.push(MigrationChange::NegativeAmount { id: label });
            }
            is_positive = false;
        }

        let description = record.description.unwrap_or_default();
        let category = record.category.unwrap_or_default();
        if !is_positive && (is_salary(&description) || is_salary(&category)) {
            report.push(MigrationChange::SalaryForcedIncome { id: label });
            is_positive = true;
        }

        let raw_currency = record.currency.unwrap_or_default();
        if raw_currency.trim().is_empty() {
            report.push(MigrationChange::DefaultCurrency { id: label });
        }
        let currency = CurrencyCode::or_base(&raw_currency);

        let raw_tags = record.tags.unwrap_or_default();
        let tags: Vec<String> = raw_tags
            .iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        if tags != raw_tags {
            report.push(MigrationChange::TagsCleaned { id: label });
        }

        let timestamp = match record.timestamp {
            Some(timestamp) => timestamp,
            None => {
                report.push(MigrationChange::MissingTimestamp { id: label });
                DateTime::<FixedOffset>::default()
            }
        };

        kept.push((
            original_id,
            Transaction {
                id: label,
                amount,
                description,
                timestamp,
                is_positive,
                tags,
                currency,
                notes: record.notes.unwrap_or_default(),
            },
        ));
    }

    let mut next_id = kept
        .iter()
        .filter_map(|(id, _)| *id)
        .max()
        .unwrap_or(0)
        + 1;
    let mut seen = HashSet::new();
    let mut transactions = Vec::with_capacity(kept.len());
    for (original_id, mut transaction) in kept {
        match original_id {
            Some(id) if seen.insert(id) => {}
            other => {
                transaction.id = next_id;
                report.push(MigrationChange::IdReassigned {
                    from: other,
                    to: next_id,
                });
                next_id += 1;
            }
        }
        transactions.push(transaction);
    }

    let stored = match (raw.balances, raw.balance) {
        (Some(balances), _) => Some(stored_balances(balances)),
        (None, Some(amount)) => {
            report.push(MigrationChange::LegacyBalance { amount });
            let mut balances = Balances::new();
            if !amount.is_zero() {
                balances.insert(CurrencyCode::base(), amount);
            }
            Some(balances)
        }
        (None, None) => None,
    };

    let ledger = Ledger::from_transactions(transactions)?;
    if let Some(stored) = stored {
        record_drift(&stored, ledger.balances(), &mut report);
    }
    Ok((ledger, report))
}

/// Parses a work log file, tolerating `null` entries and dropping repeated dates.
pub fn migrate_work_log(data: &str) -> Result<(WorkLog, MigrationReport)> {
    let raw: RawWorkLog = serde_json::from_str(data)?;
    let mut report = MigrationReport::default();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for entry in raw.entries.unwrap_or_default() {
        if !seen.insert(entry.date) {
            report.push(MigrationChange::DuplicateWorkDate { date: entry.date });
            continue;
        }
        entries.push(entry);
    }
    Ok((WorkLog { entries }, report))
}

fn stored_balances(raw: BTreeMap<String, Decimal>) -> Balances {
    let mut balances = Balances::new();
    for (code, amount) in raw {
        *balances.entry(CurrencyCode::or_base(&code)).or_default() += amount;
    }
    balances.retain(|_, amount| !amount.is_zero());
    balances
}

fn record_drift(stored: &Balances, actual: &Balances, report: &mut MigrationReport) {
    let currencies: BTreeSet<&CurrencyCode> = stored.keys().chain(actual.keys()).collect();
    for currency in currencies {
        let stored_amount = stored.get(currency).copied().unwrap_or_default();
        let actual_amount = actual.get(currency).copied().unwrap_or_default();
        if stored_amount.round_dp(2) != actual_amount.round_dp(2) {
            report.push(MigrationChange::BalanceDrift {
                currency: currency.clone(),
                stored: stored_amount,
                actual: actual_amount,
            });
        }
    }
}
