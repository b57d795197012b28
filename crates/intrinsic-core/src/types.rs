use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples and ratios (e.g., 8.5x interest coverage)
pub type Multiple = Decimal;

/// Discounted-cash-flow model variant. Closed set: adding a variant forces
/// every `match` in the engine to handle it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValuationModel {
    /// Free cash flow to firm, 5-year horizon, flat target margin
    #[default]
    Fcff,
    /// Dividend discount at cost of equity, 5-year horizon
    Ddm,
    /// FCFF over 10 years with margin converging to target
    HighGrowth,
}

impl ValuationModel {
    /// Number of explicit projection years.
    pub fn horizon_years(self) -> u32 {
        match self {
            ValuationModel::Fcff | ValuationModel::Ddm => 5,
            ValuationModel::HighGrowth => 10,
        }
    }
}

impl fmt::Display for ValuationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValuationModel::Fcff => "FCFF",
            ValuationModel::Ddm => "DDM",
            ValuationModel::HighGrowth => "HIGH_GROWTH",
        };
        f.write_str(s)
    }
}

/// Growth stage tag attached to a company by the data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    #[serde(rename = "High Growth")]
    HighGrowth,
    #[serde(rename = "Mature Stable")]
    MatureStable,
}

/// Company financial facts as supplied by the data layer.
///
/// Monetary fields share one unit (typically millions of the reporting
/// currency); nothing in the engine converts between units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Date the figures were captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    /// Current market price per share
    pub price: Money,
    /// Levered equity beta
    pub beta: Decimal,
    pub market_cap: Money,
    pub total_debt: Money,
    pub cash: Money,
    pub revenue: Money,
    /// Operating income (EBIT)
    pub operating_income: Money,
    /// Effective tax rate, used for the after-tax cost of debt
    pub tax_rate: Rate,
    pub shares_outstanding: Decimal,
    pub risk_free_rate: Rate,
    pub equity_risk_premium: Rate,
    /// Return on invested capital; zero means "unknown"
    pub roic: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividends_paid: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_income: Option<Money>,
    /// Advisory only; the engine recomputes its own WACC.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacc: Option<Rate>,
    /// Advisory only; the engine recomputes its own cost of debt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_of_debt: Option<Rate>,
    /// Advisory only; the engine recomputes its own rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthetic_rating: Option<String>,
    #[serde(default)]
    pub suggested_model: ValuationModel,
    /// Trailing year-over-year revenue growth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<Lifecycle>,
}

impl FinancialFacts {
    /// Operating income over revenue, 0 when revenue is zero.
    pub fn operating_margin(&self) -> Rate {
        if self.revenue.is_zero() {
            Decimal::ZERO
        } else {
            self.operating_income / self.revenue
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. No wall-clock fields: identical inputs
/// serialise identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_serialises_as_tag() {
        let json = serde_json::to_string(&ValuationModel::HighGrowth).unwrap();
        assert_eq!(json, "\"HIGH_GROWTH\"");
        let back: ValuationModel = serde_json::from_str("\"DDM\"").unwrap();
        assert_eq!(back, ValuationModel::Ddm);
    }

    #[test]
    fn test_model_horizons() {
        assert_eq!(ValuationModel::Fcff.horizon_years(), 5);
        assert_eq!(ValuationModel::Ddm.horizon_years(), 5);
        assert_eq!(ValuationModel::HighGrowth.horizon_years(), 10);
    }

    #[test]
    fn test_lifecycle_labels() {
        let json = serde_json::to_string(&Lifecycle::MatureStable).unwrap();
        assert_eq!(json, "\"Mature Stable\"");
    }
}
