//! Domain models for nudge

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spending category chosen when logging a prospective purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Groceries")]
    Groceries,
    #[serde(rename = "Dining Out")]
    DiningOut,
    #[serde(rename = "Shopping")]
    Shopping,
    #[serde(rename = "Travel")]
    Travel,
    #[serde(rename = "Bills")]
    Bills,
    #[serde(rename = "Miscellaneous")]
    Miscellaneous,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groceries => "Groceries",
            Self::DiningOut => "Dining Out",
            Self::Shopping => "Shopping",
            Self::Travel => "Travel",
            Self::Bills => "Bills",
            Self::Miscellaneous => "Miscellaneous",
        }
    }

    pub fn all() -> &'static [Category] {
        &[
            Self::Groceries,
            Self::DiningOut,
            Self::Shopping,
            Self::Travel,
            Self::Bills,
            Self::Miscellaneous,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "groceries" => Ok(Self::Groceries),
            "diningout" | "dining" => Ok(Self::DiningOut),
            "shopping" => Ok(Self::Shopping),
            "travel" => Ok(Self::Travel),
            "bills" => Ok(Self::Bills),
            "miscellaneous" | "misc" => Ok(Self::Miscellaneous),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Qualitative judgment on a purchase decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Positive,
    Neutral,
    Negative,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            _ => Err(format!("Unknown verdict: {}", s)),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed, persisted purchase decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub id: i64,
    /// Owning account
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    /// What the user planned to buy
    pub item: String,
    /// What the user planned to spend
    pub amount: f64,
    pub category: Category,
    pub verdict: Verdict,
    /// What the user actually did (may differ from `item`)
    pub final_label: String,
    /// What the user actually spent
    pub final_amount: f64,
}

impl PurchaseRecord {
    /// Money kept by spending less than planned (never negative)
    pub fn saved(&self) -> f64 {
        let diff = self.amount - self.final_amount;
        if diff > 0.0 {
            diff
        } else {
            0.0
        }
    }
}

/// Insert payload for a purchase decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub user_id: i64,
    pub item: String,
    pub amount: f64,
    pub category: Category,
    pub verdict: Verdict,
    pub final_label: String,
    pub final_amount: f64,
}

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// An authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
    /// Bearer token; only its digest is stored
    pub token: String,
}

impl Session {
    /// Name shown in greetings ("alex" for "alex@example.com")
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_labels() {
        for cat in Category::all() {
            let parsed: Category = cat.as_str().parse().unwrap();
            assert_eq!(parsed, *cat);
        }
        assert_eq!("dining_out".parse::<Category>().unwrap(), Category::DiningOut);
        assert!("Gadgets".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Category::DiningOut).unwrap();
        assert_eq!(json, "\"Dining Out\"");
    }

    #[test]
    fn test_verdict_rejects_unknown_tokens() {
        assert_eq!("Positive".parse::<Verdict>().unwrap(), Verdict::Positive);
        assert_eq!(" negative ".parse::<Verdict>().unwrap(), Verdict::Negative);
        assert!("maybe".parse::<Verdict>().is_err());
        assert!("".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_saved_never_negative() {
        let mut record = PurchaseRecord {
            id: 1,
            user_id: 1,
            created_at: Utc::now(),
            item: "Headphones".into(),
            amount: 50.0,
            category: Category::Shopping,
            verdict: Verdict::Neutral,
            final_label: "Bought nicer ones".into(),
            final_amount: 80.0,
        };
        assert_eq!(record.saved(), 0.0);
        record.final_amount = 20.0;
        assert_eq!(record.saved(), 30.0);
    }

    #[test]
    fn test_session_display_name() {
        let session = Session {
            user_id: 1,
            email: "alex@example.com".into(),
            token: "t".into(),
        };
        assert_eq!(session.display_name(), "alex");
    }
}
