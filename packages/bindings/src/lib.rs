use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use intrinsic_core::credit::rating::classify_coverage;
use intrinsic_core::fundamentals::statements::{derive_facts as derive, StatementInput};
use intrinsic_core::scenarios::sensitivity::{run_sensitivity, SensitivityInput};
use intrinsic_core::valuation::cost_of_capital::{
    estimate_cost_of_debt, estimate_wacc, run_cost_of_capital,
};
use intrinsic_core::valuation::engine::{run_valuation, ValuationInputs};
use intrinsic_core::{FinancialFacts, ValuationModel};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_decimal(field: &str, raw: &str) -> NapiResult<Decimal> {
    raw.trim()
        .parse()
        .map_err(|e| to_napi_error(format!("Invalid {field} '{raw}': {e}")))
}

/// Valuation request; inputs are seeded from the facts and the model taken
/// from the facts' suggestion when omitted.
#[derive(Deserialize)]
struct ValuationRequest {
    facts: FinancialFacts,
    #[serde(default)]
    inputs: Option<ValuationInputs>,
    #[serde(default)]
    model: Option<ValuationModel>,
}

// ---------------------------------------------------------------------------
// Credit
// ---------------------------------------------------------------------------

/// Coverage ratio as a decimal string in; `{ rating, spread }` JSON out.
#[napi]
pub fn classify_interest_coverage(coverage: String) -> NapiResult<String> {
    let band = classify_coverage(parse_decimal("coverage", &coverage)?);
    serde_json::to_string(&band).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Cost of capital
// ---------------------------------------------------------------------------

#[napi]
pub fn cost_of_debt(facts_json: String) -> NapiResult<String> {
    let facts: FinancialFacts = serde_json::from_str(&facts_json).map_err(to_napi_error)?;
    Ok(estimate_cost_of_debt(&facts).to_string())
}

/// WACC using the supplied pre-tax cost of debt, or the synthetic estimate
/// when none is given.
#[napi]
pub fn wacc(facts_json: String, pre_tax_cost_of_debt: Option<String>) -> NapiResult<String> {
    let facts: FinancialFacts = serde_json::from_str(&facts_json).map_err(to_napi_error)?;
    let kd = match pre_tax_cost_of_debt {
        Some(raw) => parse_decimal("cost_of_debt", &raw)?,
        None => estimate_cost_of_debt(&facts),
    };
    Ok(estimate_wacc(&facts, kd).to_string())
}

#[napi]
pub fn cost_of_capital(facts_json: String) -> NapiResult<String> {
    let facts: FinancialFacts = serde_json::from_str(&facts_json).map_err(to_napi_error)?;
    serde_json::to_string(&run_cost_of_capital(&facts)).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_valuation(input_json: String) -> NapiResult<String> {
    let request: ValuationRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let inputs = request
        .inputs
        .unwrap_or_else(|| ValuationInputs::from_facts(&request.facts));
    let model = request.model.unwrap_or(request.facts.suggested_model);
    let output = run_valuation(&request.facts, &inputs, model).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: SensitivityInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Fundamentals
// ---------------------------------------------------------------------------

#[napi]
pub fn derive_facts(input_json: String) -> NapiResult<String> {
    let input: StatementInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = derive(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
