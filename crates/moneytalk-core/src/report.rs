//! Monthly financial report engine
//!
//! Turns one user's transactions for a calendar month into a `FinancialReport`:
//! income and expense totals, net savings, and expense categories ranked by
//! spend. The engine holds no state between calls and never writes to a store.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    Category, CategorySummary, Direction, FinancialReport, Transaction, SUPPORTED_YEARS,
};
use crate::store::{CategoryStore, TransactionStore};

/// First instant of the month (`YYYY-MM-01 00:00:00`)
///
/// Years outside `SUPPORTED_YEARS` can hold no transactions and are rejected.
pub fn period_start(year: i32, month: u32) -> Result<NaiveDateTime> {
    if !SUPPORTED_YEARS.contains(&year) {
        return Err(Error::InvalidPeriod { year, month });
    }
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(Error::InvalidPeriod { year, month })
}

/// Last second of the month's last calendar day (`23:59:59`)
pub fn period_end(year: i32, month: u32) -> Result<NaiveDateTime> {
    last_day_of_month(year, month)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .ok_or(Error::InvalidPeriod { year, month })
}

/// Last calendar day of a month, leap years included
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next_month.pred_opt()
}

/// Report for a month with no transactions
pub fn empty_report(year: i32, month: u32) -> Result<FinancialReport> {
    Ok(FinancialReport {
        period_start: period_start(year, month)?,
        period_end: period_end(year, month)?,
        total_income: Decimal::ZERO,
        total_expense: Decimal::ZERO,
        net_savings: Decimal::ZERO,
        top_spending_categories: Vec::new(),
    })
}

/// Running total for one expense category
struct Bucket {
    total: Decimal,
    count: u32,
    /// First transaction seen, reported if the category cannot be resolved
    first_transaction: Uuid,
}

fn overflow(what: &str) -> Error {
    Error::Overflow(format!("{} exceeds the representable range", what))
}

fn sum_amounts(what: &str, transactions: &[&Transaction]) -> Result<Decimal> {
    transactions.iter().try_fold(Decimal::ZERO, |acc, tx| {
        acc.checked_add(tx.amount).ok_or_else(|| overflow(what))
    })
}

/// Aggregate already-fetched transactions into a report
///
/// `categories` must be the owning user's categories. An expense whose
/// category is missing from it is a `DataConsistency` error.
pub fn build_report(
    year: i32,
    month: u32,
    transactions: &[Transaction],
    categories: &[Category],
) -> Result<FinancialReport> {
    if transactions.is_empty() {
        return empty_report(year, month);
    }

    let (income, expense): (Vec<&Transaction>, Vec<&Transaction>) = transactions
        .iter()
        .partition(|tx| tx.direction == Direction::In);

    let total_income = sum_amounts("total income", &income)?;
    let total_expense = sum_amounts("total expense", &expense)?;
    let net_savings = total_income
        .checked_sub(total_expense)
        .ok_or_else(|| overflow("net savings"))?;

    debug!(
        %total_income,
        %total_expense,
        income_count = income.len(),
        expense_count = expense.len(),
        "Partitioned transactions"
    );

    let mut buckets: HashMap<Uuid, Bucket> = HashMap::new();
    for tx in &expense {
        let bucket = buckets.entry(tx.category_id).or_insert(Bucket {
            total: Decimal::ZERO,
            count: 0,
            first_transaction: tx.id,
        });
        bucket.total = bucket
            .total
            .checked_add(tx.amount)
            .ok_or_else(|| overflow("category total"))?;
        bucket.count += 1;
    }

    let names: HashMap<Uuid, &str> = categories
        .iter()
        .map(|c| (c.id, c.name.as_str()))
        .collect();

    let mut ranked: Vec<(Uuid, CategorySummary)> = Vec::with_capacity(buckets.len());
    for (category_id, bucket) in buckets {
        let name = names
            .get(&category_id)
            .ok_or(Error::DataConsistency {
                transaction_id: bucket.first_transaction,
                category_id,
            })?;
        ranked.push((
            category_id,
            CategorySummary {
                category: (*name).to_string(),
                total: bucket.total,
                count: bucket.count,
            },
        ));
    }

    // Total descending; equal totals fall back to name, then id, ascending
    ranked.sort_by(|(a_id, a), (b_id, b)| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a_id.cmp(b_id))
    });

    debug!(categories = ranked.len(), "Ranked expense categories");

    Ok(FinancialReport {
        period_start: period_start(year, month)?,
        period_end: period_end(year, month)?,
        total_income,
        total_expense,
        net_savings,
        top_spending_categories: ranked.into_iter().map(|(_, summary)| summary).collect(),
    })
}

/// Report generator over borrowed stores
pub struct FinanceEngine<'a> {
    transactions: &'a dyn TransactionStore,
    categories: &'a dyn CategoryStore,
}

impl<'a> FinanceEngine<'a> {
    pub fn new(transactions: &'a dyn TransactionStore, categories: &'a dyn CategoryStore) -> Self {
        Self {
            transactions,
            categories,
        }
    }

    /// Build the report for `user_id` covering `month`/`year`
    ///
    /// A month with no transactions is not an error and yields the empty
    /// report. Store failures propagate unchanged as `Error::Store`.
    pub async fn generate_monthly_report(
        &self,
        user_id: Uuid,
        month: u32,
        year: i32,
    ) -> Result<FinancialReport> {
        // Reject impossible periods before touching the store
        period_start(year, month)?;

        let transactions = self
            .transactions
            .list_for_user_month(user_id, month, year)
            .await?;

        if transactions.is_empty() {
            debug!(user_id = %user_id, month, year, "No transactions, returning empty report");
            return empty_report(year, month);
        }

        let categories = self.categories.list_for_user(user_id).await?;
        build_report(year, month, &transactions, &categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::CategoryType;
    use async_trait::async_trait;
    use chrono::{Timelike, Utc};
    use std::str::FromStr;

    struct FakeStore {
        transactions: Vec<Transaction>,
        categories: Vec<Category>,
        fail: bool,
    }

    #[async_trait]
    impl TransactionStore for FakeStore {
        async fn list_for_user_month(
            &self,
            user_id: Uuid,
            month: u32,
            year: i32,
        ) -> Result<Vec<Transaction>> {
            if self.fail {
                return Err(StoreError::Database(rusqlite::Error::InvalidQuery).into());
            }
            Ok(self
                .transactions
                .iter()
                .filter(|tx| {
                    tx.user_id == user_id
                        && tx.occurred_at.month() == month
                        && tx.occurred_at.year() == year
                })
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl CategoryStore for FakeStore {
        async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Category>> {
            Ok(self
                .categories
                .iter()
                .filter(|c| c.user_id == user_id)
                .cloned()
                .collect())
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn category(user_id: Uuid, name: &str, category_type: CategoryType) -> Category {
        Category {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            category_type,
            created_at: Utc::now(),
        }
    }

    fn tx(user_id: Uuid, category: &Category, amount: &str, day: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id,
            category_id: category.id,
            amount: dec(amount),
            direction: category.category_type.direction(),
            occurred_at: NaiveDateTime::parse_from_str(day, "%Y-%m-%d %H:%M:%S").unwrap(),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_salary_and_rent_scenario() {
        let user = Uuid::new_v4();
        let salary = category(user, "Salary", CategoryType::Income);
        let rent = category(user, "Rent", CategoryType::Expense);
        let store = FakeStore {
            transactions: vec![
                tx(user, &salary, "5000", "2024-06-01 09:00:00"),
                tx(user, &rent, "1200", "2024-06-03 12:00:00"),
                tx(user, &rent, "300", "2024-06-20 18:30:00"),
            ],
            categories: vec![salary, rent],
            fail: false,
        };

        let engine = FinanceEngine::new(&store, &store);
        let report = engine.generate_monthly_report(user, 6, 2024).await.unwrap();

        assert_eq!(report.total_income, dec("5000"));
        assert_eq!(report.total_expense, dec("1500"));
        assert_eq!(report.net_savings, dec("3500"));
        assert_eq!(
            report.top_spending_categories,
            vec![CategorySummary {
                category: "Rent".to_string(),
                total: dec("1500"),
                count: 2,
            }]
        );
        assert_eq!(report.period_start.to_string(), "2024-06-01 00:00:00");
        assert_eq!(report.period_end.to_string(), "2024-06-30 23:59:59");
    }

    #[tokio::test]
    async fn test_empty_month_returns_zero_report() {
        let user = Uuid::new_v4();
        let store = FakeStore {
            transactions: vec![],
            categories: vec![],
            fail: false,
        };

        let engine = FinanceEngine::new(&store, &store);
        let report = engine.generate_monthly_report(user, 3, 2023).await.unwrap();

        assert!(report.is_empty());
        assert_eq!(report.total_income, Decimal::ZERO);
        assert_eq!(report.total_expense, Decimal::ZERO);
        assert_eq!(report.net_savings, Decimal::ZERO);
        assert!(report.top_spending_categories.is_empty());
        assert_eq!(report.period_start.to_string(), "2023-03-01 00:00:00");
        assert_eq!(report.period_end.to_string(), "2023-03-31 23:59:59");
    }

    #[tokio::test]
    async fn test_other_users_and_months_are_ignored() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let food = category(user, "Food", CategoryType::Expense);
        let other_food = category(other, "Food", CategoryType::Expense);
        let store = FakeStore {
            transactions: vec![
                tx(user, &food, "10", "2024-05-31 23:59:59"),
                tx(user, &food, "20", "2024-06-01 00:00:00"),
                tx(other, &other_food, "99", "2024-06-15 12:00:00"),
                tx(user, &food, "40", "2023-06-15 12:00:00"),
            ],
            categories: vec![food, other_food],
            fail: false,
        };

        let engine = FinanceEngine::new(&store, &store);
        let report = engine.generate_monthly_report(user, 6, 2024).await.unwrap();
        assert_eq!(report.total_expense, dec("20"));
        assert_eq!(report.top_spending_categories.len(), 1);
    }

    #[test]
    fn test_period_end_february() {
        let leap = period_end(2024, 2).unwrap();
        assert_eq!(leap.day(), 29);
        assert_eq!((leap.hour(), leap.minute(), leap.second()), (23, 59, 59));

        let common = period_end(2023, 2).unwrap();
        assert_eq!(common.day(), 28);

        assert_eq!(period_end(1900, 2).unwrap().day(), 28);
        assert_eq!(period_end(2000, 2).unwrap().day(), 29);
    }

    #[test]
    fn test_period_end_every_month() {
        let expected = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
        for (i, days) in expected.iter().enumerate() {
            let end = period_end(2023, i as u32 + 1).unwrap();
            assert_eq!(end.day(), *days, "month {}", i + 1);
            assert_eq!(end.month(), i as u32 + 1);
        }
        assert_eq!(period_end(2023, 12).unwrap().year(), 2023);
    }

    #[tokio::test]
    async fn test_invalid_month_is_rejected() {
        let store = FakeStore {
            transactions: vec![],
            categories: vec![],
            fail: false,
        };
        let engine = FinanceEngine::new(&store, &store);

        for month in [0, 13] {
            let err = engine
                .generate_monthly_report(Uuid::new_v4(), month, 2024)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidPeriod { month: m, .. } if m == month));
        }

        for year in [0, 10000] {
            let err = engine
                .generate_monthly_report(Uuid::new_v4(), 6, year)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidPeriod { year: y, .. } if y == year));
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = FakeStore {
            transactions: vec![],
            categories: vec![],
            fail: true,
        };
        let engine = FinanceEngine::new(&store, &store);

        let err = engine
            .generate_monthly_report(Uuid::new_v4(), 6, 2024)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_missing_category_is_consistency_error() {
        let user = Uuid::new_v4();
        let orphan = category(user, "Ghost", CategoryType::Expense);
        let transaction = tx(user, &orphan, "12.50", "2024-06-10 10:00:00");
        let transaction_id = transaction.id;

        let err = build_report(2024, 6, &[transaction], &[]).unwrap_err();
        match err {
            Error::DataConsistency {
                transaction_id: t,
                category_id: c,
            } => {
                assert_eq!(t, transaction_id);
                assert_eq!(c, orphan.id);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unresolved_income_category_is_not_needed() {
        let user = Uuid::new_v4();
        let salary = category(user, "Salary", CategoryType::Income);
        let report =
            build_report(2024, 6, &[tx(user, &salary, "100", "2024-06-10 10:00:00")], &[])
                .unwrap();
        assert_eq!(report.total_income, dec("100"));
        assert!(report.top_spending_categories.is_empty());
    }

    #[test]
    fn test_equal_totals_break_ties_by_name() {
        let user = Uuid::new_v4();
        let travel = category(user, "Travel", CategoryType::Expense);
        let books = category(user, "Books", CategoryType::Expense);
        let groceries = category(user, "Groceries", CategoryType::Expense);
        let transactions = vec![
            tx(user, &travel, "100", "2024-06-01 10:00:00"),
            tx(user, &books, "100", "2024-06-02 10:00:00"),
            tx(user, &groceries, "250", "2024-06-03 10:00:00"),
        ];
        let categories = vec![travel, books, groceries];

        let first = build_report(2024, 6, &transactions, &categories).unwrap();
        let names: Vec<&str> = first
            .top_spending_categories
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(names, vec!["Groceries", "Books", "Travel"]);

        let mut reversed = transactions.clone();
        reversed.reverse();
        for _ in 0..5 {
            let again = build_report(2024, 6, &reversed, &categories).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_categories_sum_to_total_and_are_sorted() {
        let user = Uuid::new_v4();
        let names = ["Rent", "Food", "Fuel", "Gym", "Pets", "Gifts"];
        let categories: Vec<Category> = names
            .iter()
            .map(|n| category(user, n, CategoryType::Expense))
            .collect();
        let salary = category(user, "Salary", CategoryType::Income);

        let mut transactions = vec![tx(user, &salary, "4321.09", "2024-01-31 23:59:59")];
        let amounts = ["0.10", "0.20", "19.99", "7.01", "850", "3.33", "3.33", "0.01"];
        for (i, amount) in amounts.iter().enumerate() {
            let cat = &categories[i % categories.len()];
            transactions.push(tx(user, cat, amount, "2024-01-15 08:00:00"));
        }

        let report = build_report(2024, 1, &transactions, &categories).unwrap();

        let summed: Decimal = report.top_spending_categories.iter().map(|c| c.total).sum();
        assert_eq!(summed, report.total_expense);
        assert_eq!(report.total_expense, dec("883.97"));
        assert_eq!(
            report.total_income - report.total_expense,
            report.net_savings
        );
        assert_eq!(report.net_savings, dec("3437.12"));

        for pair in report.top_spending_categories.windows(2) {
            assert!(pair[0].total >= pair[1].total);
        }
        let counted: u32 = report.top_spending_categories.iter().map(|c| c.count).sum();
        assert_eq!(counted as usize, amounts.len());
    }

    #[test]
    fn test_decimal_accumulation_is_exact() {
        let user = Uuid::new_v4();
        let coffee = category(user, "Coffee", CategoryType::Expense);
        let transactions: Vec<Transaction> = (0..10)
            .map(|_| tx(user, &coffee, "0.10", "2024-06-05 07:00:00"))
            .collect();

        let report = build_report(2024, 6, &transactions, &[coffee]).unwrap();
        assert_eq!(report.total_expense, dec("1.00"));
        assert_eq!(report.net_savings, dec("-1.00"));
    }

    #[test]
    fn test_totals_overflow_is_an_error() {
        let user = Uuid::new_v4();
        let rent = category(user, "Rent", CategoryType::Expense);
        let mut huge = tx(user, &rent, "1", "2024-06-05 07:00:00");
        huge.amount = Decimal::MAX;
        let mut again = huge.clone();
        again.id = Uuid::new_v4();

        let err = build_report(2024, 6, &[huge.clone(), again], &[rent.clone()]).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));

        // One maximal amount on each side still nets out
        let salary = category(user, "Salary", CategoryType::Income);
        let mut income = tx(user, &salary, "1", "2024-06-01 09:00:00");
        income.amount = Decimal::MAX;
        let report = build_report(2024, 6, &[income, huge], &[rent, salary]).unwrap();
        assert_eq!(report.net_savings, Decimal::ZERO);
    }
}
