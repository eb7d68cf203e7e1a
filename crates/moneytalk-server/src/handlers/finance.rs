//! Monthly report and insight handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use tracing::info;

use crate::{AppError, AppState, AuthUser};
use moneytalk_core::models::FinancialReport;
use moneytalk_core::{explain_with_timeout, FinanceEngine, InsightOutcome};

#[derive(Serialize)]
pub struct ReportResponse {
    pub status: &'static str,
    pub report: FinancialReport,
}

#[derive(Serialize)]
pub struct InsightSummaryResponse {
    pub status: &'static str,
    pub report: FinancialReport,
    pub ai_insight: Option<String>,
    pub ai_error: Option<String>,
}

async fn monthly_report(
    state: &AppState,
    auth: AuthUser,
    year: i32,
    month: u32,
) -> Result<FinancialReport, AppError> {
    let engine = FinanceEngine::new(&state.db, &state.db);
    Ok(engine
        .generate_monthly_report(auth.user_id, month, year)
        .await?)
}

/// GET /api/v1/finance/report/:year/:month
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<ReportResponse>, AppError> {
    let report = monthly_report(&state, auth, year, month).await?;

    Ok(Json(ReportResponse {
        status: "success",
        report,
    }))
}

/// GET /api/v1/finance/insights/summary/:year/:month
///
/// The report is computed first and returned unchanged; a missing, failing
/// or slow AI backend only fills `ai_error`.
pub async fn get_insight_summary(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<InsightSummaryResponse>, AppError> {
    let report = monthly_report(&state, auth, year, month).await?;

    let outcome = match &state.ai {
        Some(ai) => explain_with_timeout(ai, &report, state.config.insight_timeout).await,
        None => InsightOutcome::Unavailable("AI backend not configured".to_string()),
    };
    if let InsightOutcome::Generated(_) = outcome {
        info!(user_id = %auth.user_id, year, month, "Generated insight summary");
    }
    let (ai_insight, ai_error) = outcome.into_parts();

    Ok(Json(InsightSummaryResponse {
        status: "success",
        report,
        ai_insight,
        ai_error,
    }))
}
