//! Decision history and dashboard handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use nudge_core::aggregation::DashboardSummary;
use nudge_core::db::{PurchaseQuery, SortOrder};
use nudge_core::models::{Category, PurchaseRecord, Session, Verdict};

use crate::{AppError, AppState, MAX_PAGE_LIMIT};

/// Query parameters for listing purchases
#[derive(Debug, Default, Deserialize)]
pub struct ListPurchasesQuery {
    /// Calendar month, `YYYY-MM` (UTC)
    pub month: Option<String>,
    pub category: Option<String>,
    pub verdict: Option<String>,
    /// `newest` (default) or `oldest`
    pub order: Option<String>,
    pub limit: Option<i64>,
}

impl ListPurchasesQuery {
    fn into_query(self, user_id: i64) -> Result<PurchaseQuery, AppError> {
        let mut query = PurchaseQuery::for_user(user_id);

        if let Some(month) = self.month.as_deref() {
            let (year, month) = parse_month(month)
                .ok_or_else(|| AppError::bad_request("Invalid month format (use YYYY-MM)"))?;
            query = query.month(year, month);
        }
        if let Some(category) = self.category.as_deref() {
            let category: Category = category
                .parse()
                .map_err(|e: String| AppError::bad_request(&e))?;
            query = query.category(category);
        }
        if let Some(verdict) = self.verdict.as_deref() {
            let verdict: Verdict = verdict.parse().map_err(|e: String| AppError::bad_request(&e))?;
            query = query.verdict(verdict);
        }
        match self.order.as_deref() {
            None | Some("newest") => {}
            Some("oldest") => query = query.order(SortOrder::OldestFirst),
            Some(_) => return Err(AppError::bad_request("Invalid order (use newest or oldest)")),
        }
        if let Some(limit) = self.limit {
            if limit < 1 {
                return Err(AppError::bad_request("Limit must be positive"));
            }
            query = query.limit(limit.min(MAX_PAGE_LIMIT));
        }

        Ok(query)
    }
}

/// Parse `YYYY-MM`
fn parse_month(s: &str) -> Option<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", s.trim()), "%Y-%m-%d").ok()?;
    Some((date.year(), date.month()))
}

/// GET /api/purchases - The caller's saved decisions
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(params): Query<ListPurchasesQuery>,
) -> Result<Json<Vec<PurchaseRecord>>, AppError> {
    let query = params.into_query(session.user_id)?;
    let records = state.db.list_purchases(&query)?;
    Ok(Json(records))
}

/// GET /api/dashboard - Headline numbers for the caller
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<DashboardSummary>, AppError> {
    let records = state
        .db
        .list_purchases(&PurchaseQuery::for_user(session.user_id))?;
    Ok(Json(DashboardSummary::from_records(&records)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-03"), Some((2024, 3)));
        assert_eq!(parse_month(" 2023-12 "), Some((2023, 12)));
        assert_eq!(parse_month("2024-13"), None);
        assert_eq!(parse_month("March"), None);
    }

    #[test]
    fn test_query_rejects_bad_filters() {
        let bad_month = ListPurchasesQuery {
            month: Some("2024/03".into()),
            ..Default::default()
        };
        assert!(bad_month.into_query(1).is_err());

        let bad_order = ListPurchasesQuery {
            order: Some("sideways".into()),
            ..Default::default()
        };
        assert!(bad_order.into_query(1).is_err());
    }

    #[test]
    fn test_query_clamps_limit() {
        let params = ListPurchasesQuery {
            limit: Some(50_000),
            category: Some("dining out".into()),
            ..Default::default()
        };
        let query = params.into_query(7).unwrap();
        assert_eq!(query.user_id, 7);
        assert_eq!(query.limit, Some(MAX_PAGE_LIMIT));
        assert_eq!(query.category, Some(Category::DiningOut));
    }
}
