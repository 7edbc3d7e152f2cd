//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::FixedOffset;
use serde::Deserialize;

use nudge_core::models::Session;
use nudge_core::reports::{MonthlyReport, MonthlyReportGenerator};

use crate::{AppError, AppState};

/// Largest real-world UTC offset is +14:00
const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

/// Query parameters for the monthly report
#[derive(Debug, Deserialize)]
pub struct MonthlyReportQuery {
    /// Viewer's offset from UTC in minutes (e.g. -300 for UTC-5); months are
    /// cut at the viewer's midnight. Defaults to UTC.
    pub tz_offset: Option<i32>,
}

/// GET /api/reports/monthly - Month-by-month summaries with AI insight
///
/// Months whose insight fails still come back, with the fallback text.
pub async fn get_monthly_reports(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(params): Query<MonthlyReportQuery>,
) -> Result<Json<Vec<MonthlyReport>>, AppError> {
    let minutes = params.tz_offset.unwrap_or(0);
    if minutes.abs() > MAX_TZ_OFFSET_MINUTES {
        return Err(AppError::bad_request("Invalid tz_offset (minutes from UTC)"));
    }
    let tz = FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| AppError::bad_request("Invalid tz_offset (minutes from UTC)"))?;

    let reports = MonthlyReportGenerator::new(&state.db, state.coach.as_ref())
        .generate_in(session.user_id, &tz)
        .await?;

    Ok(Json(reports))
}
