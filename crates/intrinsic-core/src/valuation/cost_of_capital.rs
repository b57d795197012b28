use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::credit::rating::{classify_coverage, CreditRating, RatingBand};
use crate::types::{with_metadata, ComputationOutput, FinancialFacts, Money, Multiple, Rate};

/// Proxy annual interest rate applied to total debt when estimating interest
/// expense. Not the company's actual note rate.
pub const DEBT_RATE_PROXY: Rate = dec!(0.05);

/// Band used for the cost of debt when a company carries no debt.
pub const NO_DEBT_BAND: RatingBand = RatingBand {
    rating: CreditRating::BBB,
    spread: dec!(0.0156),
};

/// Full breakdown of the cost-of-capital estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOfCapital {
    /// Estimated interest expense (debt x proxy rate)
    pub interest_expense: Money,
    /// Operating income / interest expense; `None` when there is no debt
    pub coverage_ratio: Option<Multiple>,
    /// Rating band behind the cost of debt
    pub debt_rating: CreditRating,
    pub credit_spread: Rate,
    pub cost_of_debt: Rate,
    pub after_tax_cost_of_debt: Rate,
    pub cost_of_equity: Rate,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
    pub wacc: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Pre-tax cost of debt: risk-free rate plus the synthetic-rating spread.
pub fn estimate_cost_of_debt(facts: &FinancialFacts) -> Rate {
    facts.risk_free_rate + debt_rating_band(facts).spread
}

/// Cost of equity via CAPM: Ke = Rf + Beta * ERP. No size or liquidity
/// premium.
pub fn cost_of_equity(facts: &FinancialFacts) -> Rate {
    facts.risk_free_rate + facts.beta * facts.equity_risk_premium
}

/// Weighted average cost of capital from market-value weights.
///
/// WACC = We * Ke + Wd * Kd * (1 - t). When market cap and debt are both
/// zero the weights are zero and so is the WACC.
pub fn estimate_wacc(facts: &FinancialFacts, cost_of_debt: Rate) -> Rate {
    let (equity_weight, debt_weight) = capital_weights(facts);
    let after_tax = cost_of_debt * (Decimal::ONE - facts.tax_rate);
    equity_weight * cost_of_equity(facts) + debt_weight * after_tax
}

/// Every intermediate of the cost-of-capital estimate in one pass.
pub fn estimate_cost_of_capital(facts: &FinancialFacts) -> CostOfCapital {
    let interest_expense = estimated_interest_expense(facts);
    let coverage_ratio = debt_coverage(facts);
    let band = debt_rating_band(facts);
    let cost_of_debt = facts.risk_free_rate + band.spread;
    let (equity_weight, debt_weight) = capital_weights(facts);

    CostOfCapital {
        interest_expense,
        coverage_ratio,
        debt_rating: band.rating,
        credit_spread: band.spread,
        cost_of_debt,
        after_tax_cost_of_debt: cost_of_debt * (Decimal::ONE - facts.tax_rate),
        cost_of_equity: cost_of_equity(facts),
        equity_weight,
        debt_weight,
        wacc: estimate_wacc(facts, cost_of_debt),
    }
}

/// Same as [`estimate_cost_of_capital`], wrapped with reasonableness warnings.
pub fn run_cost_of_capital(facts: &FinancialFacts) -> ComputationOutput<CostOfCapital> {
    let mut warnings: Vec<String> = Vec::new();
    let out = estimate_cost_of_capital(facts);

    if out.equity_weight.is_zero() && out.debt_weight.is_zero() {
        warnings.push(
            "Market cap and total debt are both zero; WACC degenerates to 0".into(),
        );
    }
    if facts.operating_income < Decimal::ZERO && facts.total_debt > Decimal::ZERO {
        warnings.push(format!(
            "Negative operating income gives negative coverage; debt rated {}",
            out.debt_rating
        ));
    }
    if facts.beta > dec!(3.0) {
        warnings.push(format!(
            "High beta ({}): verify market data; betas above 3.0 are unusual",
            facts.beta
        ));
    }
    if out.wacc > dec!(0.20) {
        warnings.push(format!(
            "WACC of {} exceeds 20%; appropriate for distressed or high-risk situations only",
            out.wacc
        ));
    }

    with_metadata(
        "WACC via CAPM and synthetic-rating cost of debt",
        facts,
        warnings,
        out,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

pub(crate) fn estimated_interest_expense(facts: &FinancialFacts) -> Money {
    if facts.total_debt > Decimal::ZERO {
        facts.total_debt * DEBT_RATE_PROXY
    } else {
        Decimal::ZERO
    }
}

fn debt_coverage(facts: &FinancialFacts) -> Option<Multiple> {
    let interest = estimated_interest_expense(facts);
    if interest.is_zero() {
        None
    } else {
        Some(coverage_ratio(facts.operating_income, interest))
    }
}

/// Operating income over interest, saturating at the decimal range. Coverage
/// that large lands in the top (or, if negative, bottom) band either way.
pub(crate) fn coverage_ratio(operating_income: Money, interest: Money) -> Multiple {
    operating_income.checked_div(interest).unwrap_or(
        if operating_income.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        },
    )
}

/// Band driving the cost of debt. Debt-free companies skip the classifier.
pub(crate) fn debt_rating_band(facts: &FinancialFacts) -> RatingBand {
    match debt_coverage(facts) {
        Some(coverage) => classify_coverage(coverage),
        None => NO_DEBT_BAND,
    }
}

/// (equity weight, debt weight) on a market-value basis.
fn capital_weights(facts: &FinancialFacts) -> (Rate, Rate) {
    let total = facts.market_cap + facts.total_debt;
    if total.is_zero() {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    let equity_weight = facts.market_cap / total;
    (equity_weight, Decimal::ONE - equity_weight)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
