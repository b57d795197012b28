use clap::Args;
use serde_json::Value;

use intrinsic_core::fundamentals::statements::{derive_facts, StatementInput};

use crate::input;

/// Arguments for deriving financial facts
#[derive(Args)]
pub struct DeriveArgs {
    /// Path to JSON/YAML statement line items (or pipe JSON on stdin)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_derive(args: DeriveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let statements: StatementInput = input::stdin::file_or_stdin(args.input.as_deref(), "input")?;
    let result = derive_facts(&statements)?;
    tracing::info!(
        ticker = result.result.ticker.as_deref().unwrap_or("-"),
        suggested = %result.result.suggested_model,
        warnings = result.warnings.len(),
        "derived financial facts"
    );
    Ok(serde_json::to_value(result)?)
}
