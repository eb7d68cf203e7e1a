//! Mock backend for testing
//!
//! Narrates a report from its own fields without any LLM, so output is
//! deterministic and only ever repeats numbers already in the report.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::FinancialReport;

use super::AIBackend;

#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether calls succeed
    pub healthy: bool,
    /// Artificial latency before answering
    pub delay: Option<Duration>,
}

impl MockBackend {
    /// Healthy mock that answers immediately
    pub fn new() -> Self {
        Self {
            healthy: true,
            delay: None,
        }
    }

    /// Mock whose calls always fail
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            delay: None,
        }
    }

    /// Healthy mock that sleeps before answering
    pub fn slow(delay: Duration) -> Self {
        Self {
            healthy: true,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn explain_report(&self, report: &FinancialReport) -> Result<String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.healthy {
            return Err(Error::Ai("mock backend unavailable".into()));
        }

        let period = report.period_start.format("%B %Y");
        if report.is_empty() {
            return Ok(format!("No transactions were recorded for {}.", period));
        }

        let mut text = format!(
            "In {} you earned {} and spent {}, leaving net savings of {}.",
            period, report.total_income, report.total_expense, report.net_savings
        );
        if let Some(top) = report.top_spending_categories.first() {
            text.push_str(&format!(
                " Your largest expense category was {} at {} across {} transaction(s).",
                top.category, top.total, top.count
            ));
        }
        Ok(text)
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
