//! Savings projection handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use nudge_core::aggregation::total_saved;
use nudge_core::db::PurchaseQuery;
use nudge_core::models::Session;
use nudge_core::projection::{project, InvestmentStrategy, Projection};

use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct ProjectionQuery {
    /// Strategy key; defaults to the index fund
    pub strategy: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StrategyInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub annual_rate: f64,
}

/// GET /api/invest/strategies - The fixed strategy menu
pub async fn list_strategies() -> Json<Vec<StrategyInfo>> {
    Json(
        InvestmentStrategy::all()
            .iter()
            .map(|s| StrategyInfo {
                key: s.key(),
                label: s.label(),
                annual_rate: s.annual_rate(),
            })
            .collect(),
    )
}

/// GET /api/invest - Project the caller's total savings
pub async fn get_projection(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(params): Query<ProjectionQuery>,
) -> Result<Json<Projection>, AppError> {
    let strategy = match params.strategy.as_deref() {
        Some(s) => s
            .parse::<InvestmentStrategy>()
            .map_err(|e| AppError::bad_request(&e))?,
        None => InvestmentStrategy::default(),
    };

    let records = state
        .db
        .list_purchases(&PurchaseQuery::for_user(session.user_id))?;

    Ok(Json(project(total_saved(&records), strategy)))
}
