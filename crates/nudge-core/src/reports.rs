//! Monthly reports: per-month summaries with an AI-written narrative

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregation::{group_by_month_in, MonthlyAggregate};
use crate::ai::FinancialCoach;
use crate::db::{PurchaseQuery, PurchaseStore};
use crate::error::Result;
use crate::models::PurchaseRecord;

/// Shown in place of a narrative when the model could not produce one
pub const FALLBACK_INSIGHT: &str = "AI could not generate insights for this month.";

/// Narrative for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "text", rename_all = "lowercase")]
pub enum MonthlyInsight {
    Generated(String),
    Fallback(String),
}

impl MonthlyInsight {
    pub fn fallback() -> Self {
        Self::Fallback(FALLBACK_INSIGHT.to_string())
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Generated(t) | Self::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// One month of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub aggregate: MonthlyAggregate,
    pub insight: MonthlyInsight,
}

/// Builds month-by-month reports from stored decisions
pub struct MonthlyReportGenerator<'a> {
    store: &'a dyn PurchaseStore,
    coach: Option<&'a FinancialCoach>,
}

impl<'a> MonthlyReportGenerator<'a> {
    /// `coach` may be None, in which case every month gets the fallback text
    pub fn new(store: &'a dyn PurchaseStore, coach: Option<&'a FinancialCoach>) -> Self {
        Self { store, coach }
    }

    /// Reports for a user, months newest first, in the local time zone
    pub async fn generate(&self, user_id: i64) -> Result<Vec<MonthlyReport>> {
        self.generate_in(user_id, &Local).await
    }

    /// Reports for a user with months computed in `tz`
    pub async fn generate_in<Tz: TimeZone>(
        &self,
        user_id: i64,
        tz: &Tz,
    ) -> Result<Vec<MonthlyReport>> {
        let records = self.store.query_purchases(&PurchaseQuery::for_user(user_id))?;
        Ok(self.from_records(&records, tz).await)
    }

    /// Reports for an already-fetched record list
    ///
    /// Each month gets its own AI call; a failure only affects that month.
    pub async fn from_records<Tz: TimeZone>(
        &self,
        records: &[PurchaseRecord],
        tz: &Tz,
    ) -> Vec<MonthlyReport> {
        let mut reports = Vec::new();

        for group in group_by_month_in(records, tz) {
            let aggregate = group.summary();
            let insight = match self.coach {
                Some(coach) => match coach.monthly_insight(&aggregate).await {
                    Ok(text) => MonthlyInsight::Generated(text),
                    Err(e) => {
                        warn!(month = %aggregate.label, "Monthly insight failed: {}", e);
                        MonthlyInsight::fallback()
                    }
                },
                None => MonthlyInsight::fallback(),
            };
            reports.push(MonthlyReport { aggregate, insight });
        }

        info!(months = reports.len(), "Monthly report generated");
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIClient, MockBackend};
    use crate::db::Database;
    use crate::models::{Category, NewPurchase, Verdict};
    use crate::prompts::PromptLibrary;
    use chrono::{TimeZone as _, Utc};

    fn seed(db: &Database, user_id: i64) {
        let months = [(2026, 10, 5), (2026, 9, 12), (2026, 10, 1), (2026, 8, 20)];
        for (i, (y, m, d)) in months.into_iter().enumerate() {
            let purchase = NewPurchase {
                user_id,
                item: format!("item {}", i),
                amount: 100.0,
                category: Category::Shopping,
                verdict: if i % 2 == 0 { Verdict::Negative } else { Verdict::Positive },
                final_label: "skipped".into(),
                final_amount: 40.0,
            };
            let at = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
            db.create_purchase_at(&purchase, at).unwrap();
        }
    }

    fn db_with_user() -> (Database, i64) {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("a@example.com", "x").unwrap();
        seed(&db, user.id);
        (db, user.id)
    }

    #[tokio::test]
    async fn test_report_without_ai_uses_fallback() {
        let (db, user_id) = db_with_user();
        let reports = MonthlyReportGenerator::new(&db, None)
            .generate_in(user_id, &Utc)
            .await
            .unwrap();

        let labels: Vec<&str> = reports.iter().map(|r| r.aggregate.label.as_str()).collect();
        assert_eq!(labels, vec!["October 2026", "September 2026", "August 2026"]);
        assert!(reports.iter().all(|r| r.insight.text() == FALLBACK_INSIGHT));
        assert_eq!(reports[0].aggregate.record_count, 2);
        assert_eq!(reports[0].aggregate.total_spent, 80.0);
    }

    #[tokio::test]
    async fn test_one_failed_month_does_not_affect_others() {
        let (db, user_id) = db_with_user();
        let mock = MockBackend::new();
        mock.push_response("October went well.");
        mock.push_failure("timeout");
        mock.push_response("August was quiet.");
        let coach = FinancialCoach::with_prompts(
            AIClient::Mock(mock.clone()),
            PromptLibrary::embedded_only(),
        );

        let reports = MonthlyReportGenerator::new(&db, Some(&coach))
            .generate_in(user_id, &Utc)
            .await
            .unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(
            reports[0].insight,
            MonthlyInsight::Generated("October went well.".into())
        );
        assert!(reports[1].insight.is_fallback());
        assert_eq!(reports[2].insight.text(), "August was quiet.");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_history_yields_no_months() {
        let db = Database::in_memory().unwrap();
        let user = db.create_user("b@example.com", "x").unwrap();
        let mock = MockBackend::new();
        let coach = FinancialCoach::with_prompts(
            AIClient::Mock(mock.clone()),
            PromptLibrary::embedded_only(),
        );

        let reports = MonthlyReportGenerator::new(&db, Some(&coach))
            .generate(user.id)
            .await
            .unwrap();
        assert!(reports.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_insight_serialization() {
        let json = serde_json::to_value(MonthlyInsight::fallback()).unwrap();
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["text"], FALLBACK_INSIGHT);
    }
}
