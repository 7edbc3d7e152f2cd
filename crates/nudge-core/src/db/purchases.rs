//! Purchase decision records
//!
//! Records are written exactly once, when a decision workflow completes, and
//! are never updated or deleted afterwards.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, warn};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewPurchase, PurchaseRecord, Verdict};

/// Order of returned records by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            Self::NewestFirst => "ORDER BY created_at DESC, id DESC",
            Self::OldestFirst => "ORDER BY created_at ASC, id ASC",
        }
    }
}

/// Filter for listing a user's purchases
#[derive(Debug, Clone, Default)]
pub struct PurchaseQuery {
    pub user_id: i64,
    /// Calendar month (year, month) of the UTC creation timestamp
    pub month: Option<(i32, u32)>,
    pub category: Option<Category>,
    pub verdict: Option<Verdict>,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

impl PurchaseQuery {
    /// All purchases of a user, newest first
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    pub fn month(mut self, year: i32, month: u32) -> Self {
        self.month = Some((year, month));
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = Some(verdict);
        self
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the WHERE/ORDER/LIMIT tail and its parameters
    fn build(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = vec!["user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(self.user_id)];

        if let Some((year, month)) = self.month {
            conditions.push("strftime('%Y-%m', created_at) = ?".to_string());
            params.push(Box::new(format!("{:04}-{:02}", year, month)));
        }
        if let Some(category) = self.category {
            conditions.push("category = ?".to_string());
            params.push(Box::new(category.as_str()));
        }
        if let Some(verdict) = self.verdict {
            conditions.push("verdict = ?".to_string());
            params.push(Box::new(verdict.as_str()));
        }

        let mut sql = format!("WHERE {} {}", conditions.join(" AND "), self.order.sql());
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit));
        }

        (sql, params)
    }
}

/// Storage seam used by the decision workflow and the report generator
///
/// `insert_purchase` failures are reported as `Error::Persistence` so the
/// caller can retry the identical insert.
pub trait PurchaseStore: Send + Sync {
    fn insert_purchase(&self, purchase: &NewPurchase) -> Result<i64>;
    fn query_purchases(&self, query: &PurchaseQuery) -> Result<Vec<PurchaseRecord>>;
}

const PURCHASE_COLUMNS: &str =
    "id, user_id, created_at, item, amount, category, verdict, final_label, final_amount";

fn row_to_purchase(row: &Row) -> rusqlite::Result<PurchaseRecord> {
    let created_at: String = row.get(2)?;
    let category: String = row.get(5)?;
    let verdict: String = row.get(6)?;

    Ok(PurchaseRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: parse_datetime(&created_at),
        item: row.get(3)?,
        amount: row.get(4)?,
        category: category.parse().unwrap_or(Category::Miscellaneous),
        // The CHECK constraint keeps this column to the three tokens
        verdict: verdict.parse().unwrap_or(Verdict::Neutral),
        final_label: row.get(7)?,
        final_amount: row.get(8)?,
    })
}

impl Database {
    /// Insert a completed purchase decision, stamped with the current time
    pub fn create_purchase(&self, purchase: &NewPurchase) -> Result<i64> {
        self.create_purchase_at(purchase, Utc::now())
    }

    /// Insert a completed purchase decision with an explicit creation time
    pub fn create_purchase_at(
        &self,
        purchase: &NewPurchase,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO purchases (user_id, created_at, item, amount, category, verdict, final_label, final_amount)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                purchase.user_id,
                format_datetime(&created_at),
                purchase.item,
                purchase.amount,
                purchase.category.as_str(),
                purchase.verdict.as_str(),
                purchase.final_label,
                purchase.final_amount,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!("Inserted purchase {} for user {}", id, purchase.user_id);
        Ok(id)
    }

    /// Get a single purchase by ID
    pub fn get_purchase(&self, id: i64) -> Result<Option<PurchaseRecord>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM purchases WHERE id = ?", PURCHASE_COLUMNS);

        let record = conn
            .query_row(&sql, params![id], row_to_purchase)
            .optional()?;
        Ok(record)
    }

    /// List purchases matching a query
    pub fn list_purchases(&self, query: &PurchaseQuery) -> Result<Vec<PurchaseRecord>> {
        let conn = self.conn()?;
        let (tail, params) = query.build();
        let sql = format!("SELECT {} FROM purchases {}", PURCHASE_COLUMNS, tail);

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let records = stmt
            .query_map(param_refs.as_slice(), row_to_purchase)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Count a user's purchases
    pub fn count_purchases(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM purchases WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl PurchaseStore for Database {
    fn insert_purchase(&self, purchase: &NewPurchase) -> Result<i64> {
        self.create_purchase(purchase).map_err(|e| {
            warn!("Purchase insert failed: {}", e);
            match e {
                Error::Persistence(msg) => Error::Persistence(msg),
                other => Error::Persistence(other.to_string()),
            }
        })
    }

    fn query_purchases(&self, query: &PurchaseQuery) -> Result<Vec<PurchaseRecord>> {
        self.list_purchases(query)
    }
}
