use std::{collections::BTreeMap, fmt};

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrackerError};

/// Currency every aggregate statistic is converted into.
pub const BASE_CURRENCY: &str = "BYN";

static STANDARD_RATES: Lazy<RateTable> = Lazy::new(|| {
    let mut table = RateTable::empty();
    table.set_rate(BASE_CURRENCY, Decimal::ONE);
    table.set_rate("USD", Decimal::new(33, 1));
    table.set_rate("EUR", Decimal::new(35, 1));
    table
});

/// Upper-cased currency code such as `BYN` or `USD`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    /// The configured base currency.
    pub fn base() -> Self {
        Self::new(BASE_CURRENCY)
    }

    /// Blank input falls back to the base currency.
    pub fn or_base(code: &str) -> Self {
        if code.trim().is_empty() {
            Self::base()
        } else {
            Self::new(code)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::base()
    }
}

impl From<String> for CurrencyCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CurrencyCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed conversion rates into the base currency.
///
/// Rates are only used for aggregate statistics; stored balances are never converted.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: BTreeMap<CurrencyCode, Decimal>,
}

impl RateTable {
    pub fn empty() -> Self {
        Self {
            rates: BTreeMap::new(),
        }
    }

    /// BYN = 1.0, USD = 3.3, EUR = 3.5.
    pub fn standard() -> Self {
        STANDARD_RATES.clone()
    }

    pub fn set_rate(&mut self, code: impl Into<CurrencyCode>, rate: Decimal) {
        self.rates.insert(code.into(), rate);
    }

    /// Rate for `code`; unknown currencies are treated as already in base units.
    pub fn rate(&self, code: &CurrencyCode) -> Decimal {
        self.rates.get(code).copied().unwrap_or(Decimal::ONE)
    }

    pub fn to_base(&self, amount: Decimal, code: &CurrencyCode) -> Result<Decimal> {
        amount.checked_mul(self.rate(code)).ok_or_else(|| {
            TrackerError::Validation(format!(
                "{} is too large to convert to {}",
                format_money(amount, code),
                BASE_CURRENCY
            ))
        })
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// `left + right`, rejecting totals outside the representable range.
pub fn checked_total(left: Decimal, right: Decimal) -> Result<Decimal> {
    left.checked_add(right)
        .ok_or_else(|| TrackerError::Validation("amount total is out of range".into()))
}

/// Two-decimal rendering used by listings and reports.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// `12.50 USD` style rendering.
pub fn format_money(amount: Decimal, code: &CurrencyCode) -> String {
    format!("{} {}", format_amount(amount), code.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn codes_are_normalized() {
        assert_eq!(CurrencyCode::new(" usd ").as_str(), "USD");
        assert_eq!(CurrencyCode::or_base("  "), CurrencyCode::base());
    }

    #[test]
    fn converts_known_and_unknown_currencies() {
        let table = RateTable::standard();
        assert_eq!(table.to_base(dec!(10), &CurrencyCode::new("USD")).unwrap(), dec!(33.0));
        assert_eq!(table.to_base(dec!(10), &CurrencyCode::new("EUR")).unwrap(), dec!(35.0));
        assert_eq!(table.to_base(dec!(10), &CurrencyCode::base()).unwrap(), dec!(10));
        assert_eq!(table.to_base(dec!(10), &CurrencyCode::new("GBP")).unwrap(), dec!(10));
    }

    #[test]
    fn oversized_conversion_is_an_error() {
        let table = RateTable::standard();
        let err = table
            .to_base(Decimal::MAX, &CurrencyCode::new("USD"))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(ref message) if message.contains("USD")));
        assert!(checked_total(Decimal::MAX, Decimal::ONE).is_err());
        assert_eq!(checked_total(dec!(1.5), dec!(2)).unwrap(), dec!(3.5));
    }

    #[test]
    fn deserialization_normalizes_case() {
        let code: CurrencyCode = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(code.as_str(), "EUR");
    }

    #[test]
    fn formats_two_decimals() {
        assert_eq!(format_amount(dec!(70)), "70.00");
        assert_eq!(format_money(dec!(1.005), &CurrencyCode::new("USD")), "1.00 USD");
    }
}
