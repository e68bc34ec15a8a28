use chrono::{DateTime, FixedOffset, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::period::{Period, PeriodWindow};
use crate::{
    currency::{checked_total, CurrencyCode, RateTable},
    errors::{Result, TrackerError},
    ledger::{Ledger, Transaction},
};

/// Number of transactions listed in each "top" list.
pub const TOP_LIMIT: usize = 5;
/// Spending above this share of income triggers an insight.
const SPENDING_WARNING_RATIO: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopEntry {
    pub id: u64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl From<&Transaction> for TopEntry {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id,
            date: transaction.date(),
            description: transaction.description.clone(),
            amount: transaction.amount,
            currency: transaction.currency.clone(),
        }
    }
}

/// Per-day income and expense series, index-aligned with `labels`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub incomes: Vec<Decimal>,
    pub expenses: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodStats {
    pub period: Period,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub label: String,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_balance: Decimal,
    pub avg_daily_expense: Decimal,
    pub top_incomes: Vec<TopEntry>,
    pub top_expenses: Vec<TopEntry>,
    pub chart: ChartSeries,
    pub insights: Vec<String>,
}

/// Income and expense of the last month, converted to the base currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyOverview {
    pub income: Decimal,
    pub expense: Decimal,
    pub currency: CurrencyCode,
}

/// Aggregates the ledger over the window `period` resolves to around `anchor`.
///
/// Amounts are summed nominally regardless of currency. Transactions are
/// compared by their local wall-clock time.
pub fn compute_period(ledger: &Ledger, period: Period, anchor: NaiveDate) -> Result<PeriodStats> {
    let window = PeriodWindow::resolve(period, anchor)?;
    let matching: Vec<&Transaction> = ledger
        .transactions
        .iter()
        .filter(|transaction| window.contains(transaction.timestamp.naive_local()))
        .collect();

    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    for transaction in &matching {
        if transaction.is_positive {
            total_income = checked_total(total_income, transaction.amount)?;
        } else {
            total_expense = checked_total(total_expense, transaction.amount)?;
        }
    }

    let days = Decimal::from(window.days().max(1));
    let mut insights = Vec::new();
    // Scaling down never overflows.
    if total_expense > total_income * SPENDING_WARNING_RATIO {
        insights.push("Expenses exceed 80% of income for this period.".to_string());
    }
    let net_balance = total_income
        .checked_sub(total_expense)
        .ok_or_else(|| TrackerError::Validation("net balance is out of range".into()))?;

    Ok(PeriodStats {
        period,
        start: window.start,
        end: window.end,
        label: window.label(),
        total_income,
        total_expense,
        net_balance,
        avg_daily_expense: total_expense / days,
        top_incomes: top_entries(&matching, true),
        top_expenses: top_entries(&matching, false),
        chart: build_chart(&window, &matching)?,
        insights,
    })
}

fn top_entries(transactions: &[&Transaction], income: bool) -> Vec<TopEntry> {
    let mut selected: Vec<&Transaction> = transactions
        .iter()
        .copied()
        .filter(|transaction| transaction.is_positive == income)
        .collect();
    // stable: equal amounts keep ledger order
    selected.sort_by(|a, b| b.amount.cmp(&a.amount));
    selected.into_iter().take(TOP_LIMIT).map(TopEntry::from).collect()
}

fn build_chart(window: &PeriodWindow, transactions: &[&Transaction]) -> Result<ChartSeries> {
    let days = window.bucket_dates();
    let mut incomes = vec![Decimal::ZERO; days.len()];
    let mut expenses = vec![Decimal::ZERO; days.len()];
    for transaction in transactions {
        let date = transaction.timestamp.naive_local().date();
        let Some(index) = days.iter().position(|day| *day == date) else {
            debug!(id = transaction.id, %date, "transaction outside chart buckets");
            continue;
        };
        let bucket = if transaction.is_positive {
            &mut incomes[index]
        } else {
            &mut expenses[index]
        };
        *bucket = checked_total(*bucket, transaction.amount)?;
    }
    Ok(ChartSeries {
        labels: days
            .iter()
            .map(|day| day.format("%Y-%m-%d").to_string())
            .collect(),
        incomes,
        expenses,
    })
}

/// Totals of transactions strictly newer than one month before `now`.
pub fn monthly_overview(
    ledger: &Ledger,
    rates: &RateTable,
    now: DateTime<FixedOffset>,
) -> Result<MonthlyOverview> {
    let since = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for transaction in ledger
        .transactions
        .iter()
        .filter(|transaction| transaction.timestamp > since)
    {
        let converted = rates.to_base(transaction.amount, &transaction.currency)?;
        if transaction.is_positive {
            income = checked_total(income, converted)?;
        } else {
            expense = checked_total(expense, converted)?;
        }
    }
    Ok(MonthlyOverview {
        income,
        expense,
        currency: CurrencyCode::base(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionDraft;
    use chrono::{NaiveTime, TimeZone};
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger
            .add_at(TransactionDraft::income(dec!(1000), "Salary", "BYN"), at(2024, 3, 4, 10))
            .unwrap();
        ledger
            .add_at(TransactionDraft::expense(dec!(300), "Rent", "BYN"), at(2024, 3, 5, 12))
            .unwrap();
        ledger
            .add_at(TransactionDraft::expense(dec!(50), "Food", "USD"), at(2024, 3, 6, 18))
            .unwrap();
        ledger
            .add_at(TransactionDraft::expense(dec!(20), "Taxi", "BYN"), at(2024, 3, 20, 9))
            .unwrap();
        ledger
    }

    #[test]
    fn week_totals_and_chart() {
        let stats = compute_period(&ledger(), Period::Week, date(2024, 3, 6)).unwrap();
        assert_eq!(stats.total_income, dec!(1000));
        assert_eq!(stats.total_expense, dec!(350));
        assert_eq!(stats.net_balance, dec!(650));
        assert_eq!(stats.avg_daily_expense, dec!(50));
        assert_eq!(stats.chart.labels.len(), 8);
        assert_eq!(stats.chart.labels[0], "2024-03-04");
        assert_eq!(stats.chart.labels[7], "2024-03-11");
        assert_eq!(stats.chart.incomes[0], dec!(1000));
        assert_eq!(stats.chart.expenses[1], dec!(300));
        assert_eq!(stats.chart.expenses[2], dec!(50));
        assert!(stats.insights.is_empty());
    }

    #[test]
    fn top_lists_are_sorted_and_capped() {
        let mut ledger = Ledger::new();
        for amount in [5, 9, 1, 9, 3, 7, 2] {
            ledger
                .add_at(
                    TransactionDraft::expense(Decimal::from(amount), format!("e{}", amount), "BYN"),
                    at(2024, 3, 10, 8),
                )
                .unwrap();
        }
        let stats = compute_period(&ledger, Period::Month, date(2024, 3, 1)).unwrap();
        let amounts: Vec<Decimal> = stats.top_expenses.iter().map(|e| e.amount).collect();
        assert_eq!(amounts, vec![dec!(9), dec!(9), dec!(7), dec!(5), dec!(3)]);
        assert_eq!(stats.top_expenses[0].id, 2);
        assert_eq!(stats.top_expenses[1].id, 4);
        assert!(stats.top_incomes.is_empty());
    }

    #[test]
    fn boundary_midnight_is_included() {
        let mut ledger = Ledger::new();
        let midnight = FixedOffset::east_opt(0)
            .unwrap()
            .from_local_datetime(&date(2024, 3, 11).and_time(NaiveTime::MIN))
            .unwrap();
        ledger
            .add_at(TransactionDraft::expense(dec!(10), "Late", "BYN"), midnight)
            .unwrap();
        let stats = compute_period(&ledger, Period::Week, date(2024, 3, 4)).unwrap();
        assert_eq!(stats.total_expense, dec!(10));
        assert_eq!(stats.chart.expenses[7], dec!(10));
    }

    #[test]
    fn day_period_uses_single_bucket() {
        let stats = compute_period(&ledger(), Period::Day, date(2024, 3, 5)).unwrap();
        assert_eq!(stats.chart.labels, vec!["2024-03-05".to_string()]);
        assert_eq!(stats.total_expense, dec!(300));
        assert_eq!(stats.avg_daily_expense, dec!(300));
    }

    #[test]
    fn heavy_spending_produces_insight() {
        let mut ledger = Ledger::new();
        ledger
            .add_at(TransactionDraft::income(dec!(100), "Gift", "BYN"), at(2024, 3, 4, 10))
            .unwrap();
        ledger
            .add_at(TransactionDraft::expense(dec!(81), "Shoes", "BYN"), at(2024, 3, 4, 11))
            .unwrap();
        let stats = compute_period(&ledger, Period::Day, date(2024, 3, 4)).unwrap();
        assert_eq!(stats.insights.len(), 1);
    }

    #[test]
    fn empty_period_is_all_zero() {
        let stats = compute_period(&ledger(), Period::Month, date(2023, 1, 1)).unwrap();
        assert_eq!(stats.total_income, Decimal::ZERO);
        assert_eq!(stats.avg_daily_expense, Decimal::ZERO);
        assert_eq!(stats.chart.labels.len(), 32);
        assert!(stats.insights.is_empty());
    }

    #[test]
    fn overview_converts_last_month_to_base() {
        let overview = monthly_overview(&ledger(), &RateTable::standard(), at(2024, 4, 10, 0)).unwrap();
        assert_eq!(overview.income, Decimal::ZERO);
        assert_eq!(overview.expense, dec!(20));

        let overview = monthly_overview(&ledger(), &RateTable::standard(), at(2024, 3, 30, 0)).unwrap();
        assert_eq!(overview.income, dec!(1000));
        assert_eq!(overview.expense, dec!(300) + dec!(165) + dec!(20));
        assert_eq!(overview.currency, CurrencyCode::base());
    }

    #[test]
    fn oversized_totals_are_errors() {
        let mut ledger = Ledger::new();
        for description in ["a", "b"] {
            ledger
                .add_at(TransactionDraft::income(dec!(1), description, "USD"), at(2024, 3, 4, 10))
                .unwrap();
        }
        ledger.transactions[0].amount = Decimal::MAX;
        assert!(matches!(
            compute_period(&ledger, Period::Day, date(2024, 3, 4)),
            Err(TrackerError::Validation(_))
        ));
        assert!(matches!(
            monthly_overview(&ledger, &RateTable::standard(), at(2024, 3, 10, 0)),
            Err(TrackerError::Validation(_))
        ));
        assert!(compute_period(&ledger, Period::Day, NaiveDate::MAX).is_err());
    }
}
