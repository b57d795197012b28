//! Assemble [`FinancialFacts`] from raw statement line items.
//!
//! Mirrors what the data layer does after pulling an income statement,
//! balance sheet and cash-flow statement: effective tax rate with a sanity
//! clamp, ROIC on invested capital, trailing revenue growth, a lifecycle tag
//! and a suggested model. Optional market inputs fall back to fixed
//! defaults.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::credit::rating::classify_coverage;
use crate::error::ValuationError;
use crate::types::{
    with_metadata, ComputationOutput, FinancialFacts, Lifecycle, Money, Rate, ValuationModel,
};
use crate::ValuationResult;

/// Statutory rate used when the effective rate is missing or implausible.
pub const DEFAULT_TAX_RATE: Rate = dec!(0.21);
/// Effective tax rates above this are treated as noise.
pub const MAX_EFFECTIVE_TAX_RATE: Rate = dec!(0.5);
pub const DEFAULT_RISK_FREE_RATE: Rate = dec!(0.042);
pub const DEFAULT_EQUITY_RISK_PREMIUM: Rate = dec!(0.045);
pub const DEFAULT_BETA: Decimal = dec!(1.0);
/// Revenue growth above this tags the company as high growth.
pub const HIGH_GROWTH_LIFECYCLE: Rate = dec!(0.15);
/// Revenue growth above this suggests the 10-year model.
pub const HIGH_GROWTH_MODEL: Rate = dec!(0.20);
/// Coverage assigned when no interest expense is reported.
const NO_INTEREST_COVERAGE: Decimal = dec!(100);

/// Sectors whose balance sheets make FCFF unreliable; valued on dividends.
const DIVIDEND_SECTORS: [&str; 2] = ["Financial Services", "Real Estate"];

/// Raw statement figures for the most recent fiscal year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Price per share; never scaled
    pub price: Money,
    pub shares_outstanding: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
    pub revenue: Money,
    /// Prior fiscal year revenue, for trailing growth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_prior: Option<Money>,
    pub operating_income: Money,
    pub pretax_income: Money,
    pub tax_provision: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_expense: Option<Money>,
    pub total_debt: Money,
    pub cash: Money,
    pub total_equity: Money,
    /// Sign as reported in the cash-flow statement; the magnitude is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividends_paid: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_income: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_free_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_risk_premium: Option<Rate>,
    /// Divisor applied to monetary amounts and share count (e.g. 1000000 to
    /// report in millions). Defaults to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Decimal>,
}

/// Build valuation-ready facts from statement line items.
pub fn derive_facts(
    input: &StatementInput,
) -> ValuationResult<ComputationOutput<FinancialFacts>> {
    let mut warnings: Vec<String> = Vec::new();

    let scale = input.scale.unwrap_or(Decimal::ONE);
    if scale <= Decimal::ZERO {
        return Err(ValuationError::invalid("scale", "Scale must be positive"));
    }
    if input.shares_outstanding < Decimal::ZERO || input.price < Decimal::ZERO {
        return Err(ValuationError::invalid(
            "price / shares_outstanding",
            "Price and share count cannot be negative",
        ));
    }

    let market_cap = match input.market_cap {
        Some(mc) if !mc.is_zero() => mc,
        _ => {
            let implied = input.price * input.shares_outstanding;
            if implied.is_zero() {
                return Err(ValuationError::MissingData(
                    "market_cap: supply market_cap or both price and shares_outstanding".into(),
                ));
            }
            warnings.push("Market cap missing; estimated as price x shares outstanding".into());
            implied
        }
    };

    let tax_rate = effective_tax_rate(input, &mut warnings);

    let invested_capital = input.total_equity + input.total_debt - input.cash;
    let roic = if invested_capital.is_zero() {
        warnings.push("Invested capital is zero; ROIC reported as 0".into());
        Decimal::ZERO
    } else {
        input.operating_income / invested_capital
    };

    let revenue_growth = match input.revenue_prior {
        Some(prior) if prior > Decimal::ZERO => (input.revenue - prior) / prior,
        _ => {
            warnings.push("No usable prior-year revenue; trailing growth set to 0".into());
            Decimal::ZERO
        }
    };
    let lifecycle = if revenue_growth > HIGH_GROWTH_LIFECYCLE {
        Lifecycle::HighGrowth
    } else {
        Lifecycle::MatureStable
    };
    let suggested_model = suggest_model(input.sector.as_deref(), revenue_growth);

    let beta = input.beta.unwrap_or_else(|| {
        warnings.push(format!("Beta missing; defaulted to {DEFAULT_BETA}"));
        DEFAULT_BETA
    });
    let risk_free_rate = input.risk_free_rate.unwrap_or_else(|| {
        warnings.push(format!(
            "Risk-free rate missing; defaulted to {DEFAULT_RISK_FREE_RATE}"
        ));
        DEFAULT_RISK_FREE_RATE
    });
    let equity_risk_premium = input
        .equity_risk_premium
        .unwrap_or(DEFAULT_EQUITY_RISK_PREMIUM);

    // Reported interest gives an advisory rating; the engine prices debt
    // off its own proxy.
    let (cost_of_debt, synthetic_rating) = match input.interest_expense {
        Some(interest) => {
            let interest = interest.abs();
            let coverage = if interest > Decimal::ZERO {
                input.operating_income / interest
            } else {
                NO_INTEREST_COVERAGE
            };
            let band = classify_coverage(coverage);
            (
                Some(risk_free_rate + band.spread),
                Some(band.rating.to_string()),
            )
        }
        None => (None, None),
    };

    let facts = FinancialFacts {
        ticker: input.ticker.as_ref().map(|t| t.to_uppercase()),
        as_of: input.as_of,
        price: input.price,
        beta,
        market_cap: market_cap / scale,
        total_debt: input.total_debt / scale,
        cash: input.cash / scale,
        revenue: input.revenue / scale,
        operating_income: input.operating_income / scale,
        tax_rate,
        shares_outstanding: input.shares_outstanding / scale,
        risk_free_rate,
        equity_risk_premium,
        roic,
        dividends_paid: input.dividends_paid.map(|d| d.abs() / scale),
        net_income: input.net_income.map(|n| n / scale),
        wacc: None,
        cost_of_debt,
        synthetic_rating,
        suggested_model,
        revenue_growth: Some(revenue_growth),
        lifecycle: Some(lifecycle),
    };

    Ok(with_metadata(
        "Financial facts from statement line items",
        input,
        warnings,
        facts,
    ))
}

/// Pick a model from sector and trailing growth.
pub fn suggest_model(sector: Option<&str>, revenue_growth: Rate) -> ValuationModel {
    if sector.is_some_and(|s| DIVIDEND_SECTORS.contains(&s)) {
        ValuationModel::Ddm
    } else if revenue_growth > HIGH_GROWTH_MODEL {
        ValuationModel::HighGrowth
    } else {
        ValuationModel::Fcff
    }
}

fn effective_tax_rate(input: &StatementInput, warnings: &mut Vec<String>) -> Rate {
    let rate = if input.pretax_income.is_zero() {
        Decimal::ZERO
    } else {
        input.tax_provision / input.pretax_income
    };
    if rate <= Decimal::ZERO || rate > MAX_EFFECTIVE_TAX_RATE {
        warnings.push(format!(
            "Effective tax rate {rate} outside (0, {MAX_EFFECTIVE_TAX_RATE}]; using {DEFAULT_TAX_RATE}"
        ));
        DEFAULT_TAX_RATE
    } else {
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::rating::CreditRating;
    use pretty_assertions::assert_eq;

    fn sample_input() -> StatementInput {
        StatementInput {
            ticker: Some("acme".into()),
            as_of: NaiveDate::from_ymd_opt(2024, 12, 31),
            sector: Some("Industrials".into()),
            price: dec!(50),
            shares_outstanding: dec!(100),
            market_cap: Some(dec!(5000)),
            beta: Some(dec!(1.1)),
            revenue: dec!(1100),
            revenue_prior: Some(dec!(1000)),
            operating_income: dec!(220),
            pretax_income: dec!(200),
            tax_provision: dec!(50),
            interest_expense: Some(dec!(-20)),
            total_debt: dec!(400),
            cash: dec!(100),
            total_equity: dec!(1200),
            dividends_paid: Some(dec!(-30)),
            net_income: Some(dec!(150)),
            risk_free_rate: Some(dec!(0.04)),
            equity_risk_premium: Some(dec!(0.05)),
            scale: None,
        }
    }

    #[test]
    fn test_derived_ratios() {
        let out = derive_facts(&sample_input()).unwrap();
        let facts = &out.result;

        assert_eq!(facts.ticker.as_deref(), Some("ACME"));
        assert_eq!(facts.tax_rate, dec!(0.25));
        // 220 / (1200 + 400 - 100) = 0.14666...
        assert!((facts.roic - dec!(0.146667)).abs() < dec!(0.00001));
        assert_eq!(facts.revenue_growth, Some(dec!(0.1)));
        assert_eq!(facts.lifecycle, Some(Lifecycle::MatureStable));
        assert_eq!(facts.suggested_model, ValuationModel::Fcff);
        // Dividends reported negative in the cash-flow statement
        assert_eq!(facts.dividends_paid, Some(dec!(30)));
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn test_advisory_rating_from_reported_interest() {
        let out = derive_facts(&sample_input()).unwrap();
        // Coverage = 220 / 20 = 11x => AAA
        assert_eq!(out.result.synthetic_rating.as_deref(), Some("AAA"));
        assert_eq!(out.result.cost_of_debt, Some(dec!(0.0463)));

        let mut input = sample_input();
        input.interest_expense = Some(Decimal::ZERO);
        let out = derive_facts(&input).unwrap();
        assert_eq!(
            out.result.synthetic_rating,
            Some(CreditRating::AAA.to_string())
        );

        input.interest_expense = None;
        let out = derive_facts(&input).unwrap();
        assert_eq!(out.result.synthetic_rating, None);
        assert_eq!(out.result.cost_of_debt, None);
    }

    #[test]
    fn test_tax_rate_clamped() {
        let mut input = sample_input();
        input.tax_provision = dec!(150); // 75%
        let out = derive_facts(&input).unwrap();
        assert_eq!(out.result.tax_rate, DEFAULT_TAX_RATE);
        assert!(out.warnings.iter().any(|w| w.contains("Effective tax rate")));

        input.tax_provision = dec!(-10);
        assert_eq!(derive_facts(&input).unwrap().result.tax_rate, DEFAULT_TAX_RATE);

        input.pretax_income = Decimal::ZERO;
        assert_eq!(derive_facts(&input).unwrap().result.tax_rate, DEFAULT_TAX_RATE);
    }

    #[test]
    fn test_model_suggestion() {
        assert_eq!(
            suggest_model(Some("Financial Services"), dec!(0.30)),
            ValuationModel::Ddm
        );
        assert_eq!(suggest_model(Some("Real Estate"), dec!(0)), ValuationModel::Ddm);
        assert_eq!(
            suggest_model(Some("Technology"), dec!(0.25)),
            ValuationModel::HighGrowth
        );
        assert_eq!(suggest_model(None, dec!(0.20)), ValuationModel::Fcff);
    }

    #[test]
    fn test_high_growth_lifecycle() {
        let mut input = sample_input();
        input.revenue = dec!(1160);
        let out = derive_facts(&input).unwrap();
        assert_eq!(out.result.lifecycle, Some(Lifecycle::HighGrowth));
        assert_eq!(out.result.suggested_model, ValuationModel::Fcff);
    }

    #[test]
    fn test_defaults_applied() {
        let mut input = sample_input();
        input.beta = None;
        input.risk_free_rate = None;
        input.equity_risk_premium = None;
        input.revenue_prior = None;
        let out = derive_facts(&input).unwrap();
        assert_eq!(out.result.beta, DEFAULT_BETA);
        assert_eq!(out.result.risk_free_rate, DEFAULT_RISK_FREE_RATE);
        assert_eq!(out.result.equity_risk_premium, DEFAULT_EQUITY_RISK_PREMIUM);
        assert_eq!(out.result.revenue_growth, Some(Decimal::ZERO));
        assert_eq!(out.warnings.len(), 3);
    }

    #[test]
    fn test_market_cap_fallback() {
        let mut input = sample_input();
        input.market_cap = None;
        let out = derive_facts(&input).unwrap();
        assert_eq!(out.result.market_cap, dec!(5000));

        input.shares_outstanding = Decimal::ZERO;
        match derive_facts(&input).unwrap_err() {
            ValuationError::MissingData(msg) => assert!(msg.contains("market_cap")),
            e => panic!("Expected MissingData, got {e:?}"),
        }
    }

    #[test]
    fn test_scale_to_millions() {
        let mut input = sample_input();
        input.revenue = dec!(1100000000);
        input.revenue_prior = Some(dec!(1000000000));
        input.operating_income = dec!(220000000);
        input.total_debt = dec!(400000000);
        input.shares_outstanding = dec!(100000000);
        input.market_cap = Some(dec!(5000000000));
        input.scale = Some(dec!(1000000));
        let facts = derive_facts(&input).unwrap().result;
        assert_eq!(facts.revenue, dec!(1100));
        assert_eq!(facts.shares_outstanding, dec!(100));
        assert_eq!(facts.market_cap, dec!(5000));
        assert_eq!(facts.price, dec!(50));
    }
}
