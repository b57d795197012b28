mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::fundamentals::DeriveArgs;
use commands::rating::RatingArgs;
use commands::sensitivity::SensitivityArgs;
use commands::valuation::{ValueArgs, WaccArgs};

/// Synthetic-rating DCF valuation
#[derive(Parser)]
#[command(
    name = "intrinsic",
    version,
    about = "Synthetic-rating DCF valuation",
    long_about = "Values a company from its financial facts with decimal precision. \
                  Supports synthetic credit ratings, WACC estimation, FCFF / DDM / \
                  high-growth DCF models, two-way sensitivity grids, and deriving \
                  facts from statement line items."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log progress to stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Map an interest coverage ratio to a synthetic rating and spread
    Rating(RatingArgs),
    /// Cost of capital breakdown (cost of debt, cost of equity, WACC)
    Wacc(WaccArgs),
    /// Run a valuation (FCFF, DDM or high-growth DCF)
    Value(ValueArgs),
    /// Two-way sensitivity grid of intrinsic value per share
    Sensitivity(SensitivityArgs),
    /// Derive financial facts from statement line items
    Derive(DeriveArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Rating(args) => commands::rating::run_rating(args),
        Commands::Wacc(args) => commands::valuation::run_wacc(args),
        Commands::Value(args) => commands::valuation::run_value(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Derive(args) => commands::fundamentals::run_derive(args),
        Commands::Version => {
            println!("intrinsic {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
