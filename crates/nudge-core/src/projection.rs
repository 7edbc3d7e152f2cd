//! Compound-growth projection of money saved

use serde::{Deserialize, Serialize};

/// Years covered by a projection
pub const PROJECTION_HORIZON_YEARS: u32 = 20;

/// Spacing between projection points
pub const CHECKPOINT_INTERVAL_YEARS: u32 = 5;

/// Fixed menu of annual return assumptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentStrategy {
    #[default]
    #[serde(rename = "snp")]
    SnP500,
    Bonds,
    Growth,
    Cash,
}

impl InvestmentStrategy {
    /// Stable key used on the command line and in the API
    pub fn key(&self) -> &'static str {
        match self {
            Self::SnP500 => "snp",
            Self::Bonds => "bonds",
            Self::Growth => "growth",
            Self::Cash => "cash",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SnP500 => "S&P 500 Index Fund",
            Self::Bonds => "Low-Risk Government Bonds",
            Self::Growth => "High-Growth Tech Portfolio",
            Self::Cash => "Cash Savings",
        }
    }

    /// Annual rate as a fraction (0.10 = 10%)
    pub fn annual_rate(&self) -> f64 {
        match self {
            Self::SnP500 => 0.10,
            Self::Bonds => 0.04,
            Self::Growth => 0.15,
            Self::Cash => 0.005,
        }
    }

    pub fn all() -> &'static [InvestmentStrategy] {
        &[Self::SnP500, Self::Bonds, Self::Growth, Self::Cash]
    }
}

impl std::str::FromStr for InvestmentStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "snp" | "sp500" | "s&p" => Ok(Self::SnP500),
            "bonds" => Ok(Self::Bonds),
            "growth" => Ok(Self::Growth),
            "cash" => Ok(Self::Cash),
            _ => Err(format!(
                "Unknown strategy: {} (expected snp, bonds, growth or cash)",
                s
            )),
        }
    }
}

impl std::fmt::Display for InvestmentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.1}% ROI)", self.label(), self.annual_rate() * 100.0)
    }
}

/// `principal × (1 + annual_rate)^years`
pub fn future_value(principal: f64, annual_rate: f64, years: u32) -> f64 {
    if principal <= 0.0 {
        return 0.0;
    }
    principal * (1.0 + annual_rate).powi(years as i32)
}

/// One point on the projection chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub years: u32,
    /// "Now", "5 Yr", ...
    pub label: String,
    /// Rounded to whole currency units
    pub value: f64,
}

/// Growth of a principal under one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub strategy: InvestmentStrategy,
    pub principal: f64,
    pub annual_rate: f64,
    /// Empty when the principal is not positive
    pub points: Vec<ProjectionPoint>,
    /// Value at the horizon, unrounded
    pub future_value: f64,
}

/// Project a principal over the fixed horizon
pub fn project(principal: f64, strategy: InvestmentStrategy) -> Projection {
    let rate = strategy.annual_rate();

    let points = if principal > 0.0 {
        (0..=PROJECTION_HORIZON_YEARS)
            .step_by(CHECKPOINT_INTERVAL_YEARS as usize)
            .map(|years| ProjectionPoint {
                years,
                label: if years == 0 {
                    "Now".to_string()
                } else {
                    format!("{} Yr", years)
                },
                value: future_value(principal, rate, years).round(),
            })
            .collect()
    } else {
        Vec::new()
    };

    Projection {
        strategy,
        principal,
        annual_rate: rate,
        points,
        future_value: future_value(principal, rate, PROJECTION_HORIZON_YEARS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_value() {
        let fv = future_value(1000.0, 0.10, 20);
        assert!((fv - 6727.50).abs() < 0.01, "got {}", fv);
        assert_eq!(future_value(0.0, 0.10, 20), 0.0);
        assert_eq!(future_value(-5.0, 0.10, 20), 0.0);
        assert_eq!(future_value(100.0, 0.10, 0), 100.0);
    }

    #[test]
    fn test_projection_points() {
        let p = project(1000.0, InvestmentStrategy::SnP500);
        let labels: Vec<&str> = p.points.iter().map(|pt| pt.label.as_str()).collect();
        assert_eq!(labels, vec!["Now", "5 Yr", "10 Yr", "15 Yr", "20 Yr"]);
        assert_eq!(p.points[0].value, 1000.0);
        assert_eq!(p.points[1].value, 1611.0);
        assert_eq!(p.points[4].value, 6727.0);
        assert!((p.future_value - 6727.4999).abs() < 0.001);
    }

    #[test]
    fn test_projection_empty_for_non_positive_principal() {
        let p = project(0.0, InvestmentStrategy::Growth);
        assert!(p.points.is_empty());
        assert_eq!(p.future_value, 0.0);
    }

    #[test]
    fn test_strategy_menu() {
        assert_eq!(InvestmentStrategy::all().len(), 4);
        for s in InvestmentStrategy::all() {
            assert_eq!(s.key().parse::<InvestmentStrategy>().unwrap(), *s);
        }
        assert_eq!(InvestmentStrategy::Cash.annual_rate(), 0.005);
        assert_eq!(
            InvestmentStrategy::Bonds.to_string(),
            "Low-Risk Government Bonds (4.0% ROI)"
        );
        assert_eq!(
            serde_json::to_string(&InvestmentStrategy::SnP500).unwrap(),
            "\"snp\""
        );
        assert!("crypto".parse::<InvestmentStrategy>().is_err());
    }
}
