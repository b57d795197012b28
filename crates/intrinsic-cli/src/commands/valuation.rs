use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use intrinsic_core::valuation::cost_of_capital::run_cost_of_capital;
use intrinsic_core::valuation::engine::{run_valuation, ValuationInputs};
use intrinsic_core::{FinancialFacts, ValuationModel};

use crate::input;

/// Model selector as spelled on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    Fcff,
    Ddm,
    HighGrowth,
}

impl From<ModelArg> for ValuationModel {
    fn from(m: ModelArg) -> Self {
        match m {
            ModelArg::Fcff => ValuationModel::Fcff,
            ModelArg::Ddm => ValuationModel::Ddm,
            ModelArg::HighGrowth => ValuationModel::HighGrowth,
        }
    }
}

/// Arguments for the cost of capital breakdown
#[derive(Args)]
pub struct WaccArgs {
    /// Path to JSON/YAML financial facts (or pipe JSON on stdin)
    #[arg(long)]
    pub facts: Option<String>,
}

/// Lever flags layered over the assumptions file
#[derive(Args, Debug, Default)]
pub struct LeverArgs {
    /// Annual revenue growth over the explicit horizon (e.g. 0.10)
    #[arg(long)]
    pub revenue_growth: Option<Decimal>,

    /// Target operating margin
    #[arg(long, alias = "margin")]
    pub target_margin: Option<Decimal>,

    /// Tax rate applied to operating income
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Terminal growth rate (capped at 3%)
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Override the estimated WACC
    #[arg(long)]
    pub wacc: Option<Decimal>,
}

/// Arguments for a valuation run
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValueArgs {
    /// Path to JSON/YAML financial facts (or pipe JSON on stdin)
    #[arg(long)]
    pub facts: Option<String>,

    /// Path to JSON/YAML valuation inputs; seeded from the facts when omitted
    #[arg(long)]
    pub assumptions: Option<String>,

    /// Valuation model; defaults to the facts' suggested model
    #[arg(long, value_enum)]
    pub model: Option<ModelArg>,

    #[command(flatten)]
    pub levers: LeverArgs,
}

pub(crate) fn load_facts(path: Option<&str>) -> Result<FinancialFacts, Box<dyn std::error::Error>> {
    let facts: FinancialFacts = input::stdin::file_or_stdin(path, "facts")?;
    tracing::info!(
        ticker = facts.ticker.as_deref().unwrap_or("-"),
        suggested = %facts.suggested_model,
        "loaded financial facts"
    );
    Ok(facts)
}

/// Assumptions file (or facts-seeded defaults) with any lever flags applied.
pub(crate) fn resolve_inputs(
    facts: &FinancialFacts,
    assumptions: Option<&str>,
    levers: &LeverArgs,
) -> Result<ValuationInputs, Box<dyn std::error::Error>> {
    let mut inputs = match assumptions {
        Some(path) => input::file::read_input(path)?,
        None => ValuationInputs::from_facts(facts),
    };
    apply_levers(&mut inputs, levers);
    tracing::debug!(?inputs, "resolved valuation inputs");
    Ok(inputs)
}

fn apply_levers(inputs: &mut ValuationInputs, levers: &LeverArgs) {
    if let Some(v) = levers.revenue_growth {
        inputs.revenue_growth = v;
    }
    if let Some(v) = levers.target_margin {
        inputs.target_operating_margin = v;
    }
    if let Some(v) = levers.tax_rate {
        inputs.tax_rate = v;
    }
    if let Some(v) = levers.terminal_growth {
        inputs.terminal_growth_rate = v;
    }
    if levers.wacc.is_some() {
        inputs.wacc_override = levers.wacc;
    }
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let facts = load_facts(args.facts.as_deref())?;
    let result = run_cost_of_capital(&facts);
    tracing::info!(wacc = %result.result.wacc, rating = %result.result.debt_rating, "estimated cost of capital");
    Ok(serde_json::to_value(result)?)
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let facts = load_facts(args.facts.as_deref())?;
    let inputs = resolve_inputs(&facts, args.assumptions.as_deref(), &args.levers)?;
    let model = args.model.map(ValuationModel::from).unwrap_or(facts.suggested_model);

    let result = run_valuation(&facts, &inputs, model)?;
    tracing::info!(
        %model,
        intrinsic_value = %result.result.intrinsic_value,
        warnings = result.warnings.len(),
        "valuation complete"
    );
    Ok(serde_json::to_value(result)?)
}
