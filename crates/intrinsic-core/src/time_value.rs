use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::ValuationResult;

/// End-of-year discount factors for periods `1..=years`.
///
/// Each factor is the previous one multiplied by `1 / (1 + rate)`, so the
/// schedule compounds the same rounded step rather than re-deriving
/// `(1 + rate)^t` for every year.
pub fn cumulative_discount_factors(rate: Rate, years: u32) -> ValuationResult<Vec<Rate>> {
    if rate == dec!(-1) {
        return Err(ValuationError::DivisionByZero {
            context: "discount factor 1 / (1 + rate) at rate -100%".into(),
        });
    }
    if rate < dec!(-1) {
        return Err(ValuationError::invalid(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let step = div(
        Decimal::ONE,
        add(Decimal::ONE, rate, "discount_rate")?,
        "discount_rate",
    )?;
    let mut factor = Decimal::ONE;
    let mut factors = Vec::with_capacity(years as usize);
    for _ in 0..years {
        factor = mul(factor, step, "discount_rate")?;
        factors.push(factor);
    }
    Ok(factors)
}

/// Gordon growth capitalisation: `next_cash_flow / (rate - growth)`.
pub fn gordon_growth_value(
    next_cash_flow: Money,
    rate: Rate,
    growth: Rate,
) -> ValuationResult<Money> {
    let spread = sub(rate, growth, "terminal_growth_rate")?;
    if spread <= Decimal::ZERO {
        return Err(ValuationError::invalid(
            "terminal_growth_rate",
            format!("Discount rate ({rate}) must exceed terminal growth ({growth})"),
        ));
    }
    div(next_cash_flow, spread, "terminal_growth_rate")
}

// Checked arithmetic: overflow becomes an error against the driving input.

pub(crate) fn add(a: Decimal, b: Decimal, field: &str) -> ValuationResult<Decimal> {
    a.checked_add(b).ok_or_else(|| ValuationError::overflow(field))
}

pub(crate) fn sub(a: Decimal, b: Decimal, field: &str) -> ValuationResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| ValuationError::overflow(field))
}

pub(crate) fn mul(a: Decimal, b: Decimal, field: &str) -> ValuationResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| ValuationError::overflow(field))
}

pub(crate) fn div(a: Decimal, b: Decimal, field: &str) -> ValuationResult<Decimal> {
    a.checked_div(b).ok_or_else(|| ValuationError::overflow(field))
}
