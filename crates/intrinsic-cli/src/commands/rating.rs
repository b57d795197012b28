use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use serde_json::Value;

use intrinsic_core::credit::rating::{classify_coverage, threshold_for, CreditRating};
use intrinsic_core::{with_metadata, Multiple, Rate};

/// Coverage reported when interest expense is zero.
const NO_INTEREST_COVERAGE: Multiple = dec!(100);

/// Arguments for the synthetic rating lookup
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct RatingArgs {
    /// Interest coverage ratio (operating income / interest expense)
    #[arg(long, conflicts_with_all = ["operating_income", "interest_expense"])]
    pub coverage: Option<Decimal>,

    /// Operating income (EBIT); used with --interest-expense instead of --coverage
    #[arg(long, requires = "interest_expense")]
    pub operating_income: Option<Decimal>,

    /// Annual interest expense
    #[arg(long, requires = "operating_income")]
    pub interest_expense: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct RatingOutput {
    coverage: Multiple,
    rating: CreditRating,
    spread: Rate,
    /// Coverage the ratio must exceed for this band; none for D
    threshold: Option<Multiple>,
}

fn resolve_coverage(args: &RatingArgs) -> Result<Multiple, Box<dyn std::error::Error>> {
    if let Some(coverage) = args.coverage {
        return Ok(coverage);
    }
    match (args.operating_income, args.interest_expense) {
        (Some(income), Some(interest)) => {
            let interest = interest.abs();
            if interest.is_zero() {
                Ok(NO_INTEREST_COVERAGE)
            } else {
                Ok(income / interest)
            }
        }
        _ => Err("--coverage or --operating-income with --interest-expense is required".into()),
    }
}

pub fn run_rating(args: RatingArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let coverage = resolve_coverage(&args)?;
    let band = classify_coverage(coverage);
    tracing::info!(%coverage, rating = %band.rating, "classified coverage");

    let out = RatingOutput {
        coverage,
        rating: band.rating,
        spread: band.spread,
        threshold: threshold_for(band.rating),
    };
    let mut warnings = Vec::new();
    if coverage < Decimal::ZERO {
        warnings.push("Negative coverage (operating loss); rated D".to_string());
    }
    let output = with_metadata(
        "Synthetic rating from interest coverage",
        &serde_json::json!({ "coverage": coverage }),
        warnings,
        out,
    );
    Ok(serde_json::to_value(output)?)
}
