//! Pluggable insight backend
//!
//! Insight generation is a read-only consumer of a finished report: the
//! backend receives the serialized report and returns prose. It never sees
//! raw transactions and its output never feeds back into the numbers.
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::Result;
use crate::models::FinancialReport;
use crate::prompts::{PromptId, PromptLibrary};

/// Interface for all insight backends
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Narrate a finished report
    async fn explain_report(&self, report: &FinancialReport) -> Result<String>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    fn model(&self) -> &str;

    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Clone plus static dispatch over the available backends.
#[derive(Clone)]
pub enum AIClient {
    Ollama(OllamaBackend),
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Returns None when `ollama` is selected but `OLLAMA_HOST` is unset.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Same backend with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.clone()),
        }
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn explain_report(&self, report: &FinancialReport) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.explain_report(report).await,
            AIClient::Mock(b) => b.explain_report(report).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

/// Result of asking a backend to narrate a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsightOutcome {
    Generated(String),
    /// The backend failed or timed out; carries a client-safe reason
    Unavailable(String),
}

impl InsightOutcome {
    /// Split into `(ai_insight, ai_error)` for response bodies
    pub fn into_parts(self) -> (Option<String>, Option<String>) {
        match self {
            InsightOutcome::Generated(text) => (Some(text), None),
            InsightOutcome::Unavailable(reason) => (None, Some(reason)),
        }
    }
}

const BACKEND_FAILED: &str = "AI backend request failed";

/// Narrate a report, bounding the call by `timeout`
///
/// Never fails: backend errors and timeouts become `Unavailable`. The
/// reason is generic; backend details only go to the log.
pub async fn explain_with_timeout<B>(
    ai: &B,
    report: &FinancialReport,
    timeout: Duration,
) -> InsightOutcome
where
    B: AIBackend + ?Sized,
{
    match tokio::time::timeout(timeout, ai.explain_report(report)).await {
        Ok(Ok(text)) => InsightOutcome::Generated(text),
        Ok(Err(e)) => {
            warn!(model = ai.model(), error = %e, "Insight generation failed");
            InsightOutcome::Unavailable(BACKEND_FAILED.to_string())
        }
        Err(_) => {
            warn!(
                model = ai.model(),
                timeout_secs = timeout.as_secs(),
                "Insight generation timed out"
            );
            InsightOutcome::Unavailable(format!(
                "AI insight timed out after {}s",
                timeout.as_secs()
            ))
        }
    }
}

/// Render the system and user messages for a report
pub(crate) fn report_messages(
    prompts: &mut PromptLibrary,
    report: &FinancialReport,
) -> Result<(String, String)> {
    let report_json = serde_json::to_string_pretty(report)?;
    let period = report.period_start.format("%B %Y").to_string();

    let mut vars = HashMap::new();
    vars.insert("report_json", report_json.as_str());
    vars.insert("period", period.as_str());

    let prompt = prompts.get(PromptId::FinancialSummary)?;
    Ok((prompt.render_system(&vars), prompt.render_user(&vars)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategorySummary;
    use crate::report::empty_report;
    use crate::test_utils::MockOllamaServer;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_report() -> FinancialReport {
        let mut report = empty_report(2024, 6).unwrap();
        report.total_income = dec("5000.00");
        report.total_expense = dec("1500.00");
        report.net_savings = dec("3500.00");
        report.top_spending_categories = vec![CategorySummary {
            category: "Rent".to_string(),
            total: dec("1500.00"),
            count: 2,
        }];
        report
    }

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[test]
    fn test_report_messages_embed_report_values() {
        let mut prompts = PromptLibrary::embedded_only();
        let (system, user) = report_messages(&mut prompts, &sample_report()).unwrap();

        assert!(system.contains("Do NOT change provided values"));
        assert!(user.contains("June 2024"));
        assert!(user.contains("\"total_income\": \"5000.00\""));
        assert!(user.contains("\"category\": \"Rent\""));
        assert!(!user.contains("{{report_json}}"));
    }

    #[tokio::test]
    async fn test_explain_with_timeout_success() {
        let outcome = explain_with_timeout(
            &AIClient::mock(),
            &sample_report(),
            Duration::from_secs(5),
        )
        .await;

        match outcome {
            InsightOutcome::Generated(text) => assert!(text.contains("5000.00")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_explain_with_timeout_backend_error() {
        let outcome = explain_with_timeout(
            &MockBackend::unhealthy(),
            &sample_report(),
            Duration::from_secs(5),
        )
        .await;

        let (insight, error) = outcome.into_parts();
        assert!(insight.is_none());
        assert_eq!(error.unwrap(), "AI backend request failed");
    }

    #[tokio::test]
    async fn test_backend_failure_reason_hides_host() {
        let server = MockOllamaServer::start_failing().await;
        let client = AIClient::ollama(&server.url(), "llama3.2");

        let outcome =
            explain_with_timeout(&client, &sample_report(), Duration::from_secs(5)).await;

        let reason = match outcome {
            InsightOutcome::Unavailable(reason) => reason,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert!(!reason.contains(&server.url()));
        assert!(!reason.contains("127.0.0.1"));
        assert!(!reason.contains("500"));
    }

    #[test]
    fn test_with_model_keeps_backend() {
        let client = AIClient::ollama("http://localhost:11434", "llama3.2").with_model("mistral");
        assert_eq!(client.model(), "mistral");
        assert_eq!(client.host(), "http://localhost:11434");

        let mock = AIClient::mock().with_model("other");
        assert!(matches!(mock, AIClient::Mock(_)));
    }

    #[tokio::test]
    async fn test_explain_with_timeout_elapsed() {
        let slow = MockBackend::slow(Duration::from_secs(30));
        let outcome =
            explain_with_timeout(&slow, &sample_report(), Duration::from_millis(20)).await;

        assert!(matches!(outcome, InsightOutcome::Unavailable(ref r) if r.contains("timed out")));
    }
}
