use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValuationError;
use crate::types::*;
use crate::valuation::cost_of_capital::{estimate_cost_of_debt, estimate_wacc};
use crate::valuation::engine::{compute_valuation, ValuationInputs};
use crate::ValuationResult;

/// Upper bound on evaluated cells in one grid.
pub const MAX_GRID_CELLS: usize = 10_000;

/// An assumption the analyst can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lever {
    RevenueGrowth,
    TargetOperatingMargin,
    TaxRate,
    TerminalGrowthRate,
    Wacc,
}

impl Lever {
    pub fn as_str(self) -> &'static str {
        match self {
            Lever::RevenueGrowth => "revenue_growth",
            Lever::TargetOperatingMargin => "target_operating_margin",
            Lever::TaxRate => "tax_rate",
            Lever::TerminalGrowthRate => "terminal_growth_rate",
            Lever::Wacc => "wacc",
        }
    }

    fn apply(self, inputs: &mut ValuationInputs, value: Rate) {
        match self {
            Lever::RevenueGrowth => inputs.revenue_growth = value,
            Lever::TargetOperatingMargin => inputs.target_operating_margin = value,
            Lever::TaxRate => inputs.tax_rate = value,
            Lever::TerminalGrowthRate => inputs.terminal_growth_rate = value,
            Lever::Wacc => inputs.wacc_override = Some(value),
        }
    }

    /// Value the lever takes in the unperturbed case.
    fn base_value(self, facts: &FinancialFacts, inputs: &ValuationInputs) -> Rate {
        match self {
            Lever::RevenueGrowth => inputs.revenue_growth,
            Lever::TargetOperatingMargin => inputs.target_operating_margin,
            Lever::TaxRate => inputs.tax_rate,
            Lever::TerminalGrowthRate => inputs.terminal_growth_rate,
            Lever::Wacc => inputs
                .wacc_override
                .unwrap_or_else(|| estimate_wacc(facts, estimate_cost_of_debt(facts))),
        }
    }
}

impl fmt::Display for Lever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lever {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "revenue_growth" | "growth" => Ok(Lever::RevenueGrowth),
            "target_operating_margin" | "margin" => Ok(Lever::TargetOperatingMargin),
            "tax_rate" | "tax" => Ok(Lever::TaxRate),
            "terminal_growth_rate" | "terminal_growth" => Ok(Lever::TerminalGrowthRate),
            "wacc" => Ok(Lever::Wacc),
            other => Err(ValuationError::invalid(
                "lever",
                format!("Unknown lever '{other}'"),
            )),
        }
    }
}

/// Range to sweep one lever over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverSweep {
    pub lever: Lever,
    pub min: Rate,
    pub max: Rate,
    pub step: Rate,
}

/// Input for 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub facts: FinancialFacts,
    pub base_inputs: ValuationInputs,
    #[serde(default)]
    pub model: ValuationModel,
    pub variable_1: LeverSweep,
    pub variable_2: LeverSweep,
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub model: ValuationModel,
    pub variable_1: Lever,
    pub variable_2: Lever,
    pub variable_1_values: Vec<Rate>,
    pub variable_2_values: Vec<Rate>,
    /// Intrinsic value per share; matrix[i][j] is the value when variable_1 =
    /// variable_1_values[i] and variable_2 = variable_2_values[j]. `None`
    /// where the combination is outside the model's domain.
    pub matrix: Vec<Vec<Option<Money>>>,
    /// Intrinsic value per share with the base inputs
    pub base_case_value: Option<Money>,
    /// Grid cell nearest the base inputs (row, col)
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for a lever from min to max with step.
fn generate_sweep_values(sweep: &LeverSweep) -> ValuationResult<Vec<Rate>> {
    let field = format!("variable:{}", sweep.lever);
    if sweep.step <= Decimal::ZERO {
        return Err(ValuationError::invalid(&field, "Step must be positive"));
    }
    if sweep.min > sweep.max {
        return Err(ValuationError::invalid(&field, "Min must be <= max"));
    }
    let steps = sweep
        .max
        .checked_sub(sweep.min)
        .and_then(|span| span.checked_div(sweep.step));
    if steps.map_or(true, |n| n > Decimal::from(MAX_GRID_CELLS)) {
        return Err(ValuationError::invalid(
            &field,
            format!("Sweep would exceed {MAX_GRID_CELLS} values"),
        ));
    }

    let mut values = Vec::new();
    let mut current = sweep.min;
    while current <= sweep.max {
        values.push(current);
        // Stop if the step is lost to rounding at this magnitude
        match current.checked_add(sweep.step) {
            Some(next) if next > current => current = next,
            _ => break,
        }
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < sweep.max {
            values.push(sweep.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Rate], target: Rate) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| v.checked_sub(target).map_or(Decimal::MAX, |d| d.abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Recompute the valuation across a 2-way grid of lever values.
///
/// Each cell is a full, independent `compute_valuation` call. Cells whose
/// lever combination violates a domain precondition are left empty and
/// reported in the warnings.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> ValuationResult<ComputationOutput<SensitivityOutput>> {
    if input.variable_1.lever == input.variable_2.lever {
        return Err(ValuationError::invalid(
            "variable_2",
            format!("Both variables sweep {}", input.variable_1.lever),
        ));
    }

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = generate_sweep_values(&input.variable_2)?;
    if v1_values.len() * v2_values.len() > MAX_GRID_CELLS {
        return Err(ValuationError::invalid(
            "variable_1 x variable_2",
            format!("Grid exceeds {MAX_GRID_CELLS} cells"),
        ));
    }

    let mut warnings: Vec<String> = Vec::new();
    if input.model == ValuationModel::Ddm
        && (input.variable_1.lever == Lever::Wacc || input.variable_2.lever == Lever::Wacc)
    {
        warnings.push(
            "DDM discounts at the cost of equity; the wacc lever does not move the value".into(),
        );
    }
    let mut matrix = Vec::with_capacity(v1_values.len());

    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            let mut inputs = input.base_inputs.clone();
            input.variable_1.lever.apply(&mut inputs, *v1);
            input.variable_2.lever.apply(&mut inputs, *v2);

            match compute_valuation(&input.facts, &inputs, input.model) {
                Ok(report) => row.push(Some(report.intrinsic_value)),
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    let base_case_value =
        match compute_valuation(&input.facts, &input.base_inputs, input.model) {
            Ok(report) => Some(report.intrinsic_value),
            Err(e) => {
                warnings.push(format!("Base case failed: {e}"));
                None
            }
        };
    let base_row = closest_index(
        &v1_values,
        input.variable_1.lever.base_value(&input.facts, &input.base_inputs),
    );
    let base_col = closest_index(
        &v2_values,
        input.variable_2.lever.base_value(&input.facts, &input.base_inputs),
    );

    let output = SensitivityOutput {
        model: input.model,
        variable_1: input.variable_1.lever,
        variable_2: input.variable_2.lever,
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    Ok(with_metadata(
        "2-Way Sensitivity of Intrinsic Value per Share",
        &serde_json::json!({
            "model": input.model,
            "base_inputs": input.base_inputs,
            "variable_1": input.variable_1,
            "variable_2": input.variable_2,
        }),
        warnings,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> SensitivityInput {
        SensitivityInput {
            facts: FinancialFacts {
                ticker: None,
                as_of: None,
                price: dec!(50),
                beta: dec!(1),
                market_cap: dec!(5000),
                total_debt: dec!(500),
                cash: dec!(100),
                revenue: dec!(1000),
                operating_income: dec!(200),
                tax_rate: dec!(0.21),
                shares_outstanding: dec!(100),
                risk_free_rate: dec!(0.04),
                equity_risk_premium: dec!(0.05),
                roic: dec!(0.15),
                dividends_paid: None,
                net_income: None,
                wacc: None,
                cost_of_debt: None,
                synthetic_rating: None,
                suggested_model: ValuationModel::Fcff,
                revenue_growth: None,
                lifecycle: None,
            },
            base_inputs: ValuationInputs {
                revenue_growth: dec!(0.08),
                target_operating_margin: dec!(0.22),
                tax_rate: dec!(0.21),
                terminal_growth_rate: dec!(0.02),
                wacc_override: Some(dec!(0.09)),
            },
            model: ValuationModel::Fcff,
            variable_1: LeverSweep {
                lever: Lever::Wacc,
                min: dec!(0.07),
                max: dec!(0.11),
                step: dec!(0.01),
            },
            variable_2: LeverSweep {
                lever: Lever::TerminalGrowthRate,
                min: dec!(0.00),
                max: dec!(0.03),
                step: dec!(0.01),
            },
        }
    }

    #[test]
    fn test_grid_shape_and_base_case() {
        let result = run_sensitivity(&sample_input()).unwrap();
        let out = &result.result;

        assert_eq!(out.variable_1_values.len(), 5);
        assert_eq!(out.variable_2_values.len(), 4);
        assert_eq!(out.matrix.len(), 5);
        assert!(out.matrix.iter().all(|row| row.len() == 4));
        // Base WACC 9% is row 2, base terminal growth 2% is column 2
        assert_eq!(out.base_case_position, (2, 2));
        assert_eq!(out.matrix[2][2], out.base_case_value);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_value_falls_as_wacc_rises() {
        let result = run_sensitivity(&sample_input()).unwrap();
        let out = &result.result;
        for col in 0..out.variable_2_values.len() {
            for row in 1..out.variable_1_values.len() {
                let prev = out.matrix[row - 1][col].unwrap();
                let next = out.matrix[row][col].unwrap();
                assert!(next <= prev, "row {row} col {col}: {next} > {prev}");
            }
        }
    }

    #[test]
    fn test_invalid_cells_left_empty() {
        let mut input = sample_input();
        input.variable_1.min = dec!(0.01);
        input.variable_1.max = dec!(0.03);
        let result = run_sensitivity(&input).unwrap();
        // WACC 1% with terminal growth 2% is outside the domain
        assert_eq!(result.result.matrix[0][2], None);
        assert!(result.warnings.iter().any(|w| w.contains("Evaluation failed")));
    }

    #[test]
    fn test_max_included_when_step_overshoots() {
        let sweep = LeverSweep {
            lever: Lever::TaxRate,
            min: dec!(0.10),
            max: dec!(0.25),
            step: dec!(0.10),
        };
        let values = generate_sweep_values(&sweep).unwrap();
        assert_eq!(values, vec![dec!(0.10), dec!(0.20), dec!(0.25)]);
    }

    #[test]
    fn test_same_lever_twice_rejected() {
        let mut input = sample_input();
        input.variable_2.lever = Lever::Wacc;
        assert!(run_sensitivity(&input).is_err());
    }

    #[test]
    fn test_oversized_sweep_rejected() {
        let mut input = sample_input();
        input.variable_1.step = dec!(0.000001);
        assert!(run_sensitivity(&input).is_err());
    }

    #[test]
    fn test_dust_step_rejected_without_overflow() {
        let mut input = sample_input();
        input.variable_1 = LeverSweep {
            lever: Lever::Wacc,
            min: Decimal::ZERO,
            max: dec!(100),
            step: Decimal::new(1, 27),
        };
        match run_sensitivity(&input) {
            Err(ValuationError::InvalidAssumption { reason, .. }) => {
                assert!(reason.contains("exceed"), "unexpected reason: {reason}")
            }
            other => panic!("Expected InvalidAssumption, got {other:?}"),
        }
    }

    #[test]
    fn test_overflowing_cells_left_empty() {
        let mut input = sample_input();
        input.model = ValuationModel::HighGrowth;
        input.variable_1 = LeverSweep {
            lever: Lever::RevenueGrowth,
            min: Decimal::ZERO,
            max: dec!(1000),
            step: dec!(500),
        };
        let result = run_sensitivity(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.variable_1_values.len(), 3);
        assert!(out.matrix[0].iter().all(|cell| cell.is_some()));
        assert!(out.matrix[2].iter().all(|cell| cell.is_none()));
        assert!(result.warnings.iter().any(|w| w.contains("decimal range")));
    }

    #[test]
    fn test_wacc_lever_under_ddm_warns() {
        let mut input = sample_input();
        input.model = ValuationModel::Ddm;
        input.facts.dividends_paid = Some(dec!(40));
        let result = run_sensitivity(&input).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("wacc lever does not move the value")));
        // Rows differ only in wacc, so every row is identical
        let out = &result.result;
        assert!(out.matrix.iter().all(|row| *row == out.matrix[0]));

        let fcff = run_sensitivity(&sample_input()).unwrap();
        assert!(!fcff.warnings.iter().any(|w| w.contains("wacc lever")));
    }

    #[test]
    fn test_step_below_precision_terminates() {
        let sweep = LeverSweep {
            lever: Lever::TaxRate,
            min: dec!(100000000000000000000),
            max: dec!(100000000000000000000),
            step: Decimal::new(1, 10),
        };
        let values = generate_sweep_values(&sweep).unwrap();
        assert_eq!(values, vec![dec!(100000000000000000000)]);
    }

    #[test]
    fn test_zero_step_rejected() {
        let mut input = sample_input();
        input.variable_2.step = Decimal::ZERO;
        assert!(run_sensitivity(&input).is_err());
    }

    #[test]
    fn test_lever_parsing() {
        assert_eq!("wacc".parse::<Lever>().unwrap(), Lever::Wacc);
        assert_eq!(
            "terminal-growth".parse::<Lever>().unwrap(),
            Lever::TerminalGrowthRate
        );
        assert_eq!("Margin".parse::<Lever>().unwrap(), Lever::TargetOperatingMargin);
        assert!("beta".parse::<Lever>().is_err());
    }

    #[test]
    fn test_base_wacc_falls_back_to_estimate() {
        let mut input = sample_input();
        input.base_inputs.wacc_override = None;
        let estimate = estimate_wacc(&input.facts, estimate_cost_of_debt(&input.facts));
        assert_eq!(
            Lever::Wacc.base_value(&input.facts, &input.base_inputs),
            estimate
        );
    }
}
