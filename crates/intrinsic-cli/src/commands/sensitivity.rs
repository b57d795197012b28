use clap::Args;
use serde_json::Value;

use intrinsic_core::scenarios::sensitivity::{self, Lever, LeverSweep, SensitivityInput};
use intrinsic_core::{Rate, ValuationModel};

use super::valuation::{load_facts, resolve_inputs, LeverArgs, ModelArg};

/// Arguments for sensitivity analysis
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SensitivityArgs {
    /// Path to JSON/YAML financial facts (or pipe JSON on stdin)
    #[arg(long)]
    pub facts: Option<String>,

    /// Path to JSON/YAML base-case valuation inputs
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Valuation model; defaults to the facts' suggested model
    #[arg(long, value_enum)]
    pub model: Option<ModelArg>,

    /// Row lever in format name:min:max:step
    /// (e.g. "wacc:0.07:0.11:0.01")
    #[arg(long)]
    pub var1: String,

    /// Column lever in format name:min:max:step
    /// (e.g. "revenue_growth:0.02:0.10:0.02")
    #[arg(long)]
    pub var2: String,

    #[command(flatten)]
    pub levers: LeverArgs,
}

/// Parse `lever:min:max:step`.
fn parse_sweep(spec: &str) -> Result<LeverSweep, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be lever:min:max:step, got '{}'",
            spec
        )
        .into());
    }
    let lever: Lever = parts[0].parse()?;
    let number = |s: &str| {
        s.trim()
            .parse::<Rate>()
            .map_err(|e| format!("Invalid number '{}' in '{}': {}", s, spec, e))
    };
    Ok(LeverSweep {
        lever,
        min: number(parts[1])?,
        max: number(parts[2])?,
        step: number(parts[3])?,
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let variable_1 = parse_sweep(&args.var1)?;
    let variable_2 = parse_sweep(&args.var2)?;

    let facts = load_facts(args.facts.as_deref())?;
    let base_inputs = resolve_inputs(&facts, args.assumptions.as_deref(), &args.levers)?;
    let model = args.model.map(ValuationModel::from).unwrap_or(facts.suggested_model);

    let input = SensitivityInput {
        facts,
        base_inputs,
        model,
        variable_1,
        variable_2,
    };
    let result = sensitivity::run_sensitivity(&input)?;
    tracing::info!(
        rows = result.result.variable_1_values.len(),
        cols = result.result.variable_2_values.len(),
        warnings = result.warnings.len(),
        "sensitivity grid complete"
    );
    Ok(serde_json::to_value(result)?)
}
