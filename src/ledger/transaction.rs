use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    currency::CurrencyCode,
    errors::{Result, TrackerError},
};

pub const MAX_DESCRIPTION_LEN: usize = 100;
/// Largest accepted amount (10^15); totals of many such amounts stay representable.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// A single income or expense record.
///
/// Field names follow the on-disk ledger format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    #[serde(rename = "ID")]
    pub id: u64,
    /// Always positive; direction lives in `is_positive`.
    pub amount: Decimal,
    pub description: String,
    #[serde(rename = "DateTime")]
    pub timestamp: DateTime<FixedOffset>,
    pub is_positive: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub currency: CurrencyCode,
    #[serde(default)]
    pub notes: String,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        if self.is_positive {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }

    /// Calendar date in the offset the transaction was recorded with.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Signed contribution to the balance of `self.currency`.
    pub fn signed_amount(&self) -> Decimal {
        if self.is_positive {
            self.amount
        } else {
            -self.amount
        }
    }

    /// Splits a comma separated tag field, trimming items and dropping blanks.
    pub fn parse_tags(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn apply(&mut self, draft: TransactionDraft) {
        self.amount = draft.amount;
        self.description = draft.description.trim().to_string();
        self.currency = draft.currency_code();
        self.is_positive = draft.is_positive;
        self.tags = normalize_tags(draft.tags);
        self.notes = draft.notes;
    }
}

/// User supplied fields for creating or editing a transaction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub amount: Decimal,
    pub description: String,
    #[serde(default)]
    pub currency: String,
    pub is_positive: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl TransactionDraft {
    pub fn income(amount: Decimal, description: impl Into<String>, currency: &str) -> Self {
        Self {
            amount,
            description: description.into(),
            currency: currency.to_string(),
            is_positive: true,
            ..Self::default()
        }
    }

    pub fn expense(amount: Decimal, description: impl Into<String>, currency: &str) -> Self {
        Self {
            is_positive: false,
            ..Self::income(amount, description, currency)
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Currency after defaulting blanks to the base currency.
    pub fn currency_code(&self) -> CurrencyCode {
        CurrencyCode::or_base(&self.currency)
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount <= Decimal::ZERO {
            return Err(TrackerError::Validation(
                "amount must be greater than zero".into(),
            ));
        }
        if self.amount > MAX_AMOUNT {
            return Err(TrackerError::Validation(format!(
                "amount must not exceed {}",
                MAX_AMOUNT
            )));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(TrackerError::Validation(
                "description must not be empty".into(),
            ));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(TrackerError::Validation(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
        if self.currency_code().is_empty() {
            return Err(TrackerError::Validation("currency must not be empty".into()));
        }
        Ok(())
    }

    pub(crate) fn into_transaction(self, id: u64, timestamp: DateTime<FixedOffset>) -> Transaction {
        let mut transaction = Transaction {
            id,
            amount: Decimal::ZERO,
            description: String::new(),
            timestamp,
            is_positive: false,
            tags: Vec::new(),
            currency: CurrencyCode::base(),
            notes: String::new(),
        };
        transaction.apply(self);
        transaction
    }
}

/// Direction filter used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn matches(self, transaction: &Transaction) -> bool {
        transaction.kind() == self
    }
}

impl FromStr for TransactionKind {
    type Err = TrackerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(TrackerError::Validation(format!(
                "unknown transaction type `{}`",
                other
            ))),
        }
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
