//! Report command implementations

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use moneytalk_core::ai::{AIBackend, AIClient};
use moneytalk_core::db::Database;
use moneytalk_core::models::FinancialReport;
use moneytalk_core::{explain_with_timeout, FinanceEngine, InsightOutcome};

/// Upper bound on one narration request from the CLI
const INSIGHT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fill in a missing year or month from today's date
pub fn resolve_month(year: Option<i32>, month: Option<u32>) -> (i32, u32) {
    let today = Utc::now().date_naive();
    (
        year.unwrap_or_else(|| today.year()),
        month.unwrap_or_else(|| today.month()),
    )
}

/// AI client for `--insight`, if one is configured
///
/// `model` replaces the configured model name.
pub fn insight_client(model: Option<&str>) -> Option<AIClient> {
    let Some(ai) = AIClient::from_env() else {
        println!("   💡 Tip: Set OLLAMA_HOST for AI summaries");
        return None;
    };
    Some(match model {
        Some(model) => ai.with_model(model),
        None => ai,
    })
}

pub async fn cmd_report(
    db: &Database,
    email: &str,
    year: i32,
    month: u32,
    json: bool,
    insight: bool,
    ai: Option<&AIClient>,
) -> Result<()> {
    let user = db
        .get_user_by_email(email)?
        .with_context(|| format!("No user registered with email {}", email))?;

    let engine = FinanceEngine::new(db, db);
    let report = engine
        .generate_monthly_report(user.id, month, year)
        .await
        .context("Failed to generate report")?;

    let outcome = if insight {
        Some(match ai {
            Some(client) => {
                if !json {
                    println!("🤖 Asking {} for a summary...", client.model());
                }
                explain_with_timeout(client, &report, INSIGHT_TIMEOUT).await
            }
            None => InsightOutcome::Unavailable("AI backend not configured".to_string()),
        })
    } else {
        None
    };

    if json {
        println!("{}", report_json(&report, outcome)?);
    } else {
        print!("{}", format_report(&report));
        if let Some(outcome) = outcome {
            println!();
            match outcome {
                InsightOutcome::Generated(text) => {
                    println!("💬 Summary");
                    println!("   {}", text.trim());
                }
                InsightOutcome::Unavailable(reason) => {
                    println!("⚠️  AI summary unavailable: {}", reason);
                }
            }
        }
    }

    Ok(())
}

/// JSON for `--json`; the insight fields appear only with `--insight`
pub fn report_json(report: &FinancialReport, outcome: Option<InsightOutcome>) -> Result<String> {
    let value = match outcome {
        None => serde_json::to_value(report)?,
        Some(outcome) => {
            let (ai_insight, ai_error) = outcome.into_parts();
            serde_json::json!({
                "report": report,
                "ai_insight": ai_insight,
                "ai_error": ai_error,
            })
        }
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Human-readable report
pub fn format_report(report: &FinancialReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "📊 Financial Report: {}\n",
        report.period_start.format("%B %Y")
    ));
    out.push_str(&format!(
        "   {} to {}\n",
        report.period_start.format("%Y-%m-%d"),
        report.period_end.format("%Y-%m-%d")
    ));
    out.push_str("   ─────────────────────────────\n");

    if report.is_empty() {
        out.push_str("   No transactions recorded for this month.\n");
        return out;
    }

    out.push_str(&format!("   Income:      {:>12}\n", report.total_income));
    out.push_str(&format!("   Expenses:    {:>12}\n", report.total_expense));
    out.push_str(&format!("   Net savings: {:>12}\n", report.net_savings));

    if !report.top_spending_categories.is_empty() {
        out.push('\n');
        out.push_str("   Top spending categories\n");
        for (rank, category) in report.top_spending_categories.iter().enumerate() {
            out.push_str(&format!(
                "   {:>2}. {:<20} {:>12}  ({} tx)\n",
                rank + 1,
                category.category,
                category.total,
                category.count
            ));
        }
    }

    out
}
