//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Rating monotonicity: more coverage never earns a worse band
//! 2. Idempotence: identical arguments give identical reports
//! 3. Limited liability: equity value is never negative
//! 4. Terminal growth cap: never above 3% whatever the caller asks for

use intrinsic_core::credit::rating::classify_coverage;
use intrinsic_core::valuation::engine::{
    compute_valuation, display_rating, ValuationInputs, TERMINAL_GROWTH_CAP,
};
use intrinsic_core::{FinancialFacts, ValuationModel};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Coverage ratios in [-50, 50] with three decimal places.
fn arb_coverage() -> impl Strategy<Value = Decimal> {
    (-50_000i64..50_000).prop_map(|m| Decimal::new(m, 3))
}

/// Rates in [lo, hi) basis points, as decimals.
fn arb_rate(lo_bp: i64, hi_bp: i64) -> impl Strategy<Value = Decimal> {
    (lo_bp..hi_bp).prop_map(|bp| Decimal::new(bp, 4))
}

fn arb_money(lo: i64, hi: i64) -> impl Strategy<Value = Decimal> {
    (lo..hi).prop_map(Decimal::from)
}

fn arb_model() -> impl Strategy<Value = ValuationModel> {
    prop_oneof![
        Just(ValuationModel::Fcff),
        Just(ValuationModel::Ddm),
        Just(ValuationModel::HighGrowth),
    ]
}

fn facts(total_debt: Decimal, operating_income: Decimal) -> FinancialFacts {
    FinancialFacts {
        ticker: None,
        as_of: None,
        price: dec!(50),
        beta: dec!(1.2),
        market_cap: dec!(5000),
        total_debt,
        cash: dec!(150),
        revenue: dec!(1000),
        operating_income,
        tax_rate: dec!(0.21),
        shares_outstanding: dec!(100),
        risk_free_rate: dec!(0.04),
        equity_risk_premium: dec!(0.05),
        roic: dec!(0.12),
        dividends_paid: Some(dec!(30)),
        net_income: Some(dec!(120)),
        wacc: None,
        cost_of_debt: None,
        synthetic_rating: None,
        suggested_model: ValuationModel::Fcff,
        revenue_growth: None,
        lifecycle: None,
    }
}

fn inputs(growth: Decimal, margin: Decimal, terminal: Decimal) -> ValuationInputs {
    ValuationInputs {
        revenue_growth: growth,
        target_operating_margin: margin,
        tax_rate: dec!(0.21),
        terminal_growth_rate: terminal,
        wacc_override: None,
    }
}

// ── 1. Rating monotonicity ───────────────────────────────────────────

proptest! {
    #[test]
    fn classifier_is_non_increasing(a in arb_coverage(), b in arb_coverage()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let low = classify_coverage(lo);
        let high = classify_coverage(hi);
        prop_assert!(high.rating <= low.rating);
        prop_assert!(high.spread <= low.spread);
    }

    #[test]
    fn more_operating_income_never_worsens_rating(
        debt in arb_money(1, 20_000),
        income in arb_money(-2_000, 2_000),
        bump in arb_money(0, 2_000),
    ) {
        let base = display_rating(&facts(debt, income));
        let better = display_rating(&facts(debt, income + bump));
        prop_assert!(better <= base);
    }
}

// ── 2-4. Engine invariants ───────────────────────────────────────────

proptest! {
    #[test]
    fn valuation_is_idempotent(
        growth in arb_rate(-500, 3000),
        margin in arb_rate(0, 5000),
        terminal in arb_rate(-200, 800),
        model in arb_model(),
    ) {
        let f = facts(dec!(800), dec!(180));
        let i = inputs(growth, margin, terminal);
        let first = compute_valuation(&f, &i, model);
        let second = compute_valuation(&f, &i, model);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "outcome changed between identical calls"),
        }
    }

    #[test]
    fn equity_never_negative(
        debt in arb_money(0, 100_000),
        growth in arb_rate(-500, 4000),
        margin in arb_rate(-2000, 5000),
        model in arb_model(),
    ) {
        let f = facts(debt, dec!(180));
        if let Ok(report) = compute_valuation(&f, &inputs(growth, margin, dec!(0.02)), model) {
            prop_assert!(report.equity_value >= Decimal::ZERO);
            prop_assert!(report.intrinsic_value >= Decimal::ZERO);
        }
    }

    #[test]
    fn terminal_growth_never_exceeds_cap(
        terminal in arb_rate(-500, 2000),
        model in arb_model(),
    ) {
        let f = facts(dec!(800), dec!(180));
        if let Ok(report) = compute_valuation(&f, &inputs(dec!(0.08), dec!(0.2), terminal), model) {
            prop_assert!(report.terminal_growth <= TERMINAL_GROWTH_CAP);
            prop_assert_eq!(report.terminal_growth, terminal.min(TERMINAL_GROWTH_CAP));
        }
    }
}
