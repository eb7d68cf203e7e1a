//! Domain models for MoneyTalk

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Years an `occurred_at` may fall in; SQLite date functions cover no others
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: Uuid,
    pub username: String,
    pub user_email: String,
    /// Argon2id PHC string, never sent to clients
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Registration payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub user_email: String,
    pub password: String,
}

/// Direction of money flow for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Income
    In,
    /// Expense
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a category collects income or expenses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Income categories record money in, everything else is money out
    pub fn direction(&self) -> Direction {
        match self {
            Self::Income => Direction::In,
            Self::Expense => Direction::Out,
        }
    }
}

impl std::str::FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown category type: {}", s)),
        }
    }
}

impl std::fmt::Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-scoped category. The name is unique within a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "category_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub created_at: DateTime<Utc>,
}

/// A recorded income or expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "transaction_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    /// Always strictly positive; the sign lives in `direction`
    pub amount: Decimal,
    pub direction: Direction,
    /// Calendar-literal occurrence time (no timezone conversion)
    pub occurred_at: NaiveDateTime,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A transaction to insert
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub category_id: Uuid,
    pub amount: Decimal,
    pub direction: Direction,
    pub occurred_at: NaiveDateTime,
    pub description: Option<String>,
}

/// Partial update of a transaction; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub category_id: Option<Uuid>,
    pub direction: Option<Direction>,
    pub amount: Option<Decimal>,
    pub occurred_at: Option<NaiveDateTime>,
    pub description: Option<String>,
}

/// Transaction with its category resolved, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct TransactionWithCategory {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category_name: String,
    pub category_type: CategoryType,
}

/// Expense total for one category within a report period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Category display name
    pub category: String,
    pub total: Decimal,
    /// Number of transactions in the category
    pub count: u32,
}

/// Monthly income/expense summary for one user
///
/// Monetary fields serialize as JSON strings so downstream consumers
/// (including the language model prompt) never see a lossy float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialReport {
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_savings: Decimal,
    /// Expense categories ordered by total, largest first
    pub top_spending_categories: Vec<CategorySummary>,
}

impl FinancialReport {
    pub fn is_empty(&self) -> bool {
        self.total_income.is_zero()
            && self.total_expense.is_zero()
            && self.top_spending_categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    #[test]
    fn test_direction_roundtrip_strings() {
        assert_eq!(Direction::from_str("in").unwrap(), Direction::In);
        assert_eq!(Direction::from_str("OUT").unwrap(), Direction::Out);
        assert!(Direction::from_str("sideways").is_err());
        assert_eq!(Direction::Out.to_string(), "out");
    }

    #[test]
    fn test_category_type_direction() {
        assert_eq!(CategoryType::Income.direction(), Direction::In);
        assert_eq!(CategoryType::Expense.direction(), Direction::Out);
        assert_eq!(
            serde_json::to_value(CategoryType::Expense).unwrap(),
            serde_json::json!("expense")
        );
    }

    #[test]
    fn test_report_money_serializes_as_strings() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let report = FinancialReport {
            period_start: start,
            period_end: end,
            total_income: Decimal::from_str("5000.00").unwrap(),
            total_expense: Decimal::from_str("1500.10").unwrap(),
            net_savings: Decimal::from_str("3499.90").unwrap(),
            top_spending_categories: vec![CategorySummary {
                category: "Rent".to_string(),
                total: Decimal::from_str("1500.10").unwrap(),
                count: 2,
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["total_income"], "5000.00");
        assert_eq!(json["net_savings"], "3499.90");
        assert_eq!(json["top_spending_categories"][0]["total"], "1500.10");
        assert_eq!(json["top_spending_categories"][0]["count"], 2);
        assert_eq!(json["period_end"], "2024-06-30T23:59:59");
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            user_email: "alice@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
        assert!(json.get("user_id").is_some());
    }
}
