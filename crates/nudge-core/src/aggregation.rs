//! Savings totals and month-grouped summaries
//!
//! Everything here is derived on demand from a flat list of records and is
//! never persisted.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Category, PurchaseRecord, Verdict};

/// Money kept across all records (overspends count as zero, not negative)
pub fn total_saved(records: &[PurchaseRecord]) -> f64 {
    records.iter().map(PurchaseRecord::saved).sum()
}

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    /// 1-12
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// Month of a timestamp as seen in its own time zone
    pub fn of<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    /// Human label, e.g. "October 2026"
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{:04}-{:02}", self.year, self.month))
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Records sharing a calendar month, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthGroup {
    pub month: MonthKey,
    pub records: Vec<PurchaseRecord>,
}

impl MonthGroup {
    pub fn summary(&self) -> MonthlyAggregate {
        summarize_month(self.month, &self.records)
    }
}

/// Partition records by calendar month in the given time zone
///
/// Every record lands in exactly one group. Groups appear in order of their
/// first record, and records keep their input order within a group, so
/// newest-first input yields newest-first months.
pub fn group_by_month_in<Tz: TimeZone>(records: &[PurchaseRecord], tz: &Tz) -> Vec<MonthGroup> {
    let mut groups: Vec<MonthGroup> = Vec::new();
    let mut index: HashMap<MonthKey, usize> = HashMap::new();

    for record in records {
        let key = MonthKey::of(&record.created_at.with_timezone(tz));
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(MonthGroup {
                month: key,
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].records.push(record.clone());
    }

    groups
}

/// Partition records by calendar month in the viewer's local time zone
pub fn group_by_month(records: &[PurchaseRecord]) -> Vec<MonthGroup> {
    group_by_month_in(records, &Local)
}

/// Derived summary of one month of decisions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: MonthKey,
    pub label: String,
    /// Sum of final amounts
    pub total_spent: f64,
    /// Sum of final amounts of negative-verdict records
    pub avoidable_spend: f64,
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
    pub categories: BTreeSet<Category>,
    pub record_count: usize,
}

impl MonthlyAggregate {
    pub fn verdict_count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Positive => self.positive_count,
            Verdict::Neutral => self.neutral_count,
            Verdict::Negative => self.negative_count,
        }
    }
}

/// Summarize a month's records
pub fn summarize_month(month: MonthKey, records: &[PurchaseRecord]) -> MonthlyAggregate {
    let mut aggregate = MonthlyAggregate {
        month,
        label: month.label(),
        total_spent: 0.0,
        avoidable_spend: 0.0,
        positive_count: 0,
        neutral_count: 0,
        negative_count: 0,
        categories: BTreeSet::new(),
        record_count: records.len(),
    };

    for record in records {
        aggregate.total_spent += record.final_amount;
        aggregate.categories.insert(record.category);
        match record.verdict {
            Verdict::Positive => aggregate.positive_count += 1,
            Verdict::Neutral => aggregate.neutral_count += 1,
            Verdict::Negative => {
                aggregate.negative_count += 1;
                aggregate.avoidable_spend += record.final_amount;
            }
        }
    }

    aggregate
}

/// Headline numbers for the home screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_saved: f64,
    pub decision_count: usize,
    /// Most recent decision, if any
    pub last_decision_at: Option<DateTime<Utc>>,
}

impl DashboardSummary {
    pub fn from_records(records: &[PurchaseRecord]) -> Self {
        Self {
            total_saved: total_saved(records),
            decision_count: records.len(),
            last_decision_at: records.iter().map(|r| r.created_at).max(),
        }
    }
}
