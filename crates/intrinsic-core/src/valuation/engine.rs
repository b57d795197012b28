use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::credit::rating::{classify_coverage, CreditRating};
use crate::error::ValuationError;
use crate::time_value::{add, cumulative_discount_factors, div, gordon_growth_value, mul, sub};
use crate::types::{
    with_metadata, ComputationOutput, FinancialFacts, Money, Multiple, Rate, ValuationModel,
};
use crate::ValuationResult;

use super::cost_of_capital::{
    cost_of_equity, coverage_ratio, debt_rating_band, estimate_cost_of_debt, estimate_wacc,
    DEBT_RATE_PROXY,
};

/// Ceiling on the growth rate used in any terminal-value formula.
pub const TERMINAL_GROWTH_CAP: Rate = dec!(0.03);

/// ROIC assumed when the facts report none (zero).
pub const ROIC_FALLBACK: Rate = dec!(0.15);

/// Coverage used for the displayed rating when a company has no debt.
pub const NO_DEBT_COVERAGE: Multiple = dec!(100);

const DEFAULT_REVENUE_GROWTH: Rate = dec!(0.05);
const DEFAULT_TERMINAL_GROWTH: Rate = dec!(0.025);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Analyst-adjustable assumptions ("levers").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInputs {
    /// Annual revenue growth over the explicit horizon (also the dividend
    /// growth proxy under DDM)
    pub revenue_growth: Rate,
    /// Operating margin the business reaches (FCFF: immediately; HIGH_GROWTH:
    /// by the final year)
    pub target_operating_margin: Rate,
    /// Tax rate applied to operating income
    pub tax_rate: Rate,
    /// Perpetual growth after the horizon, capped at [`TERMINAL_GROWTH_CAP`]
    pub terminal_growth_rate: Rate,
    /// Replaces the estimated WACC when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wacc_override: Option<Rate>,
}

impl ValuationInputs {
    /// Seed the levers from the company's own figures.
    pub fn from_facts(facts: &FinancialFacts) -> Self {
        ValuationInputs {
            revenue_growth: facts.revenue_growth.unwrap_or(DEFAULT_REVENUE_GROWTH),
            target_operating_margin: facts.operating_margin(),
            tax_rate: facts.tax_rate,
            terminal_growth_rate: DEFAULT_TERMINAL_GROWTH,
            wacc_override: None,
        }
    }
}

/// One year of the explicit projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionYear {
    pub year: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nopat: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reinvestment_rate: Option<Rate>,
    /// Free cash flow to firm, or the dividend under DDM
    pub cash_flow: Money,
    /// Cumulative end-of-year discount factor
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Result of a valuation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationReport {
    pub model: ValuationModel,
    /// Intrinsic value per share
    pub intrinsic_value: Money,
    /// (intrinsic - price) / price
    pub upside: Rate,
    /// WACC actually used (override or estimate)
    pub wacc: Rate,
    pub cost_of_equity: Rate,
    pub cost_of_debt: Rate,
    /// Terminal growth after the cap
    pub terminal_growth: Rate,
    /// Sum of explicit-period present values
    pub pv_explicit: Money,
    /// Present value of the terminal value
    pub terminal_value: Money,
    pub enterprise_value: Money,
    /// Floored at zero
    pub equity_value: Money,
    /// Display rating from interest coverage
    pub rating: CreditRating,
    pub projections: Vec<ProjectionYear>,
}

/// Discount rates shared by every model arm.
#[derive(Debug, Clone, Copy)]
struct Rates {
    cost_of_debt: Rate,
    wacc: Rate,
    cost_of_equity: Rate,
    terminal_growth: Rate,
}

/// Output of a single model arm, before post-processing.
struct ArmValue {
    projections: Vec<ProjectionYear>,
    pv_explicit: Money,
    terminal_value: Money,
    enterprise_value: Money,
    equity_value: Money,
}

/// How the operating margin evolves over the explicit horizon.
#[derive(Debug, Clone, Copy)]
enum MarginPath {
    Flat,
    Converging { start: Rate },
}

impl MarginPath {
    fn margin(self, target: Rate, year: u32, horizon: u32) -> ValuationResult<Rate> {
        match self {
            MarginPath::Flat => Ok(target),
            MarginPath::Converging { start } => {
                let field = "target_operating_margin";
                let fraction = Decimal::from(year) / Decimal::from(horizon);
                add(
                    mul(target, fraction, field)?,
                    mul(start, Decimal::ONE - fraction, field)?,
                    field,
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value a company under the selected model.
///
/// Pure: identical arguments always produce an identical report. Domain
/// preconditions (discount rate above terminal growth, sane tax rate, etc.)
/// are checked up front and reported as [`ValuationError::InvalidAssumption`].
pub fn compute_valuation(
    facts: &FinancialFacts,
    inputs: &ValuationInputs,
    model: ValuationModel,
) -> ValuationResult<ValuationReport> {
    let rates = resolve_rates(facts, inputs);
    validate(facts, inputs, model, &rates)?;

    let arm = match model {
        ValuationModel::Fcff => project_firm(facts, inputs, &rates, MarginPath::Flat, model)?,
        ValuationModel::HighGrowth => {
            let start = facts.operating_margin();
            project_firm(facts, inputs, &rates, MarginPath::Converging { start }, model)?
        }
        ValuationModel::Ddm => project_dividends(facts, inputs, &rates, model)?,
    };

    let equity_value = arm.equity_value.max(Decimal::ZERO);
    let intrinsic_value = if facts.shares_outstanding > Decimal::ZERO {
        div(equity_value, facts.shares_outstanding, "shares_outstanding")?
    } else {
        Decimal::ZERO
    };
    let upside = if facts.price > Decimal::ZERO {
        div(sub(intrinsic_value, facts.price, "price")?, facts.price, "price")?
    } else {
        Decimal::ZERO
    };

    Ok(ValuationReport {
        model,
        intrinsic_value,
        upside,
        wacc: rates.wacc,
        cost_of_equity: rates.cost_of_equity,
        cost_of_debt: rates.cost_of_debt,
        terminal_growth: rates.terminal_growth,
        pv_explicit: arm.pv_explicit,
        terminal_value: arm.terminal_value,
        enterprise_value: arm.enterprise_value,
        equity_value,
        rating: display_rating(facts),
        projections: arm.projections,
    })
}

/// [`compute_valuation`] wrapped in the standard output envelope, with
/// warnings for assumptions worth a second look.
pub fn run_valuation(
    facts: &FinancialFacts,
    inputs: &ValuationInputs,
    model: ValuationModel,
) -> ValuationResult<ComputationOutput<ValuationReport>> {
    let report = compute_valuation(facts, inputs, model)?;
    let warnings = collect_warnings(facts, inputs, &report);

    let methodology = match model {
        ValuationModel::Fcff => "5-Year FCFF DCF (synthetic-rating WACC)",
        ValuationModel::Ddm => "5-Year Dividend Discount Model (CAPM cost of equity)",
        ValuationModel::HighGrowth => "10-Year High-Growth FCFF DCF (converging margin)",
    };
    let assumptions = serde_json::json!({
        "model": model,
        "inputs": inputs,
        "terminal_growth_cap": TERMINAL_GROWTH_CAP,
        "roic_fallback": ROIC_FALLBACK,
        "debt_rate_proxy": DEBT_RATE_PROXY,
    });

    Ok(with_metadata(methodology, &assumptions, warnings, report))
}

/// Rating shown alongside the valuation. Computed independently of the
/// cost-of-debt band: debt-free companies get coverage 100 here rather than
/// the default band used for pricing debt.
pub fn display_rating(facts: &FinancialFacts) -> CreditRating {
    let coverage = if facts.total_debt > Decimal::ZERO {
        coverage_ratio(facts.operating_income, facts.total_debt * DEBT_RATE_PROXY)
    } else {
        NO_DEBT_COVERAGE
    };
    classify_coverage(coverage).rating
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn resolve_rates(facts: &FinancialFacts, inputs: &ValuationInputs) -> Rates {
    let cost_of_debt = estimate_cost_of_debt(facts);
    let wacc = inputs
        .wacc_override
        .unwrap_or_else(|| estimate_wacc(facts, cost_of_debt));
    Rates {
        cost_of_debt,
        wacc,
        cost_of_equity: cost_of_equity(facts),
        terminal_growth: inputs.terminal_growth_rate.min(TERMINAL_GROWTH_CAP),
    }
}

fn validate(
    facts: &FinancialFacts,
    inputs: &ValuationInputs,
    model: ValuationModel,
    rates: &Rates,
) -> ValuationResult<()> {
    if inputs.tax_rate < Decimal::ZERO || inputs.tax_rate > Decimal::ONE {
        return Err(ValuationError::invalid(
            "tax_rate",
            "Tax rate must be between 0 and 1",
        ));
    }
    if inputs.revenue_growth <= dec!(-1) {
        return Err(ValuationError::invalid(
            "revenue_growth",
            "Revenue growth must be greater than -100%",
        ));
    }
    for (field, value) in [
        ("revenue", facts.revenue),
        ("total_debt", facts.total_debt),
        ("cash", facts.cash),
        ("shares_outstanding", facts.shares_outstanding),
        ("price", facts.price),
    ] {
        if value < Decimal::ZERO {
            return Err(ValuationError::invalid(field, "Cannot be negative"));
        }
    }

    let (field, rate) = match model {
        ValuationModel::Fcff | ValuationModel::HighGrowth => ("wacc", rates.wacc),
        ValuationModel::Ddm => ("cost_of_equity", rates.cost_of_equity),
    };
    if rate <= Decimal::ZERO {
        return Err(ValuationError::invalid(
            field,
            format!("Discount rate must be positive, got {rate}"),
        ));
    }
    if rate <= rates.terminal_growth {
        return Err(ValuationError::invalid(
            "terminal_growth_rate",
            format!(
                "Terminal growth ({}) must be below the {field} ({rate})",
                rates.terminal_growth
            ),
        ));
    }

    if model == ValuationModel::Ddm {
        if let Some(d) = facts.dividends_paid {
            if d < Decimal::ZERO {
                return Err(ValuationError::invalid(
                    "dividends_paid",
                    "Dividends paid must be reported as a positive amount",
                ));
            }
        }
    }
    Ok(())
}

/// FCFF projection shared by the FCFF and HIGH_GROWTH arms.
fn project_firm(
    facts: &FinancialFacts,
    inputs: &ValuationInputs,
    rates: &Rates,
    path: MarginPath,
    model: ValuationModel,
) -> ValuationResult<ArmValue> {
    let horizon = model.horizon_years();
    let roic = if facts.roic.is_zero() {
        ROIC_FALLBACK
    } else {
        facts.roic
    };
    let reinvestment_rate = div(inputs.revenue_growth, roic, "roic")?;
    let after_tax = Decimal::ONE - inputs.tax_rate;
    let growth_factor = add(Decimal::ONE, inputs.revenue_growth, "revenue_growth")?;
    let retained = sub(Decimal::ONE, reinvestment_rate, "revenue_growth")?;
    let factors = cumulative_discount_factors(rates.wacc, horizon)?;

    let mut projections = Vec::with_capacity(horizon as usize);
    let mut revenue = facts.revenue;
    let mut pv_explicit = Decimal::ZERO;

    for (idx, factor) in factors.iter().enumerate() {
        let year = idx as u32 + 1;
        revenue = mul(revenue, growth_factor, "revenue_growth")?;
        let margin = path.margin(inputs.target_operating_margin, year, horizon)?;
        let operating_income = mul(revenue, margin, "target_operating_margin")?;
        let nopat = mul(operating_income, after_tax, "tax_rate")?;
        let fcf = mul(nopat, retained, "revenue_growth")?;
        let pv = mul(fcf, *factor, "revenue_growth")?;
        pv_explicit = add(pv_explicit, pv, "revenue_growth")?;

        projections.push(ProjectionYear {
            year,
            revenue: Some(revenue),
            operating_margin: Some(margin),
            nopat: Some(nopat),
            reinvestment_rate: Some(reinvestment_rate),
            cash_flow: fcf,
            discount_factor: *factor,
            present_value: pv,
        });
    }

    // Steady state: WACC stands in for ROIC, so reinvestment = g / WACC.
    let g = rates.terminal_growth;
    let field = "terminal_growth_rate";
    let terminal_revenue = mul(revenue, add(Decimal::ONE, g, field)?, field)?;
    let terminal_nopat = mul(
        mul(terminal_revenue, inputs.target_operating_margin, field)?,
        after_tax,
        field,
    )?;
    let stable_reinvestment = div(g, rates.wacc, field)?;
    let terminal_fcf = mul(
        terminal_nopat,
        sub(Decimal::ONE, stable_reinvestment, field)?,
        field,
    )?;
    let terminal_undiscounted = gordon_growth_value(terminal_fcf, rates.wacc, g)?;
    let final_factor = factors.last().copied().unwrap_or(Decimal::ONE);
    let terminal_value = mul(terminal_undiscounted, final_factor, field)?;

    let enterprise_value = add(pv_explicit, terminal_value, field)?;
    let equity_value = sub(add(enterprise_value, facts.cash, "cash")?, facts.total_debt, "total_debt")?;

    Ok(ArmValue {
        projections,
        pv_explicit,
        terminal_value,
        enterprise_value,
        equity_value,
    })
}

/// Dividend discount arm: values equity directly at the cost of equity.
fn project_dividends(
    facts: &FinancialFacts,
    inputs: &ValuationInputs,
    rates: &Rates,
    model: ValuationModel,
) -> ValuationResult<ArmValue> {
    let horizon = model.horizon_years();
    let factors = cumulative_discount_factors(rates.cost_of_equity, horizon)?;

    let mut projections = Vec::with_capacity(horizon as usize);
    let mut dividend = facts.dividends_paid.unwrap_or(Decimal::ZERO);
    let mut equity_value = Decimal::ZERO;

    let growth_factor = add(Decimal::ONE, inputs.revenue_growth, "revenue_growth")?;

    for (idx, factor) in factors.iter().enumerate() {
        dividend = mul(dividend, growth_factor, "revenue_growth")?;
        let pv = mul(dividend, *factor, "revenue_growth")?;
        equity_value = add(equity_value, pv, "revenue_growth")?;

        projections.push(ProjectionYear {
            year: idx as u32 + 1,
            revenue: None,
            operating_margin: None,
            nopat: None,
            reinvestment_rate: None,
            cash_flow: dividend,
            discount_factor: *factor,
            present_value: pv,
        });
    }
    let pv_explicit = equity_value;

    let g = rates.terminal_growth;
    let field = "terminal_growth_rate";
    let next_dividend = mul(dividend, add(Decimal::ONE, g, field)?, field)?;
    let terminal_undiscounted = gordon_growth_value(next_dividend, rates.cost_of_equity, g)?;
    let final_factor = factors.last().copied().unwrap_or(Decimal::ONE);
    let terminal_value = mul(terminal_undiscounted, final_factor, field)?;
    equity_value = add(equity_value, terminal_value, field)?;

    // Equity comes first here, so the bridge runs backwards.
    let enterprise_value = sub(add(equity_value, facts.total_debt, "total_debt")?, facts.cash, "cash")?;

    Ok(ArmValue {
        projections,
        pv_explicit,
        terminal_value,
        enterprise_value,
        equity_value,
    })
}

fn collect_warnings(
    facts: &FinancialFacts,
    inputs: &ValuationInputs,
    report: &ValuationReport,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if inputs.terminal_growth_rate > TERMINAL_GROWTH_CAP {
        warnings.push(format!(
            "Terminal growth {} capped at {}",
            inputs.terminal_growth_rate, TERMINAL_GROWTH_CAP
        ));
    }
    if let Some(wacc) = inputs.wacc_override {
        warnings.push(format!(
            "WACC override {wacc} used in place of the estimate of {}",
            estimate_wacc(facts, report.cost_of_debt)
        ));
    }

    match report.model {
        ValuationModel::Fcff | ValuationModel::HighGrowth => {
            let bridged = report.enterprise_value + facts.cash - facts.total_debt;
            if bridged < Decimal::ZERO {
                warnings.push(format!(
                    "Debt exceeds enterprise value plus cash; equity value {bridged} floored at 0"
                ));
            }
            let reinvestment = report
                .projections
                .first()
                .and_then(|p| p.reinvestment_rate)
                .unwrap_or(Decimal::ZERO);
            if reinvestment > Decimal::ONE {
                warnings.push(format!(
                    "Reinvestment rate {reinvestment} exceeds 100%: revenue growth outpaces ROIC and free cash flow is negative"
                ));
            }
        }
        ValuationModel::Ddm => {
            if facts.dividends_paid.unwrap_or(Decimal::ZERO).is_zero() {
                warnings.push("No dividends paid; the dividend discount value is zero".into());
            }
        }
    }

    let tv_pct = report
        .pv_explicit
        .checked_add(report.terminal_value)
        .filter(|total| *total > Decimal::ZERO)
        .and_then(|total| report.terminal_value.checked_div(total));
    if let Some(tv_pct) = tv_pct.filter(|pct| *pct > dec!(0.75)) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of value; the explicit horizon carries little weight",
            tv_pct.saturating_mul(dec!(100))
        ));
    }

    if facts.shares_outstanding <= Decimal::ZERO {
        warnings.push("Shares outstanding is not positive; intrinsic value per share reported as 0".into());
    }
    if facts.price <= Decimal::ZERO {
        warnings.push("Market price is not positive; upside reported as 0".into());
    }

    let debt_band = debt_rating_band(facts);
    if debt_band.rating != report.rating {
        warnings.push(format!(
            "Displayed rating {} differs from the {} band used to price debt",
            report.rating, debt_band.rating
        ));
    }
    if let Some(ref advisory) = facts.synthetic_rating {
        if advisory != report.rating.as_str() {
            warnings.push(format!(
                "Supplied rating {advisory} differs from recomputed rating {}",
                report.rating
            ));
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
