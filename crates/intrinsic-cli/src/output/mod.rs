//! Renderers for the computation envelope returned by every command.

pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Render a command's envelope in the requested format.
pub fn format_output(format: &OutputFormat, envelope: &Value) {
    tracing::debug!(?format, "rendering output");
    match format {
        OutputFormat::Json => json::print_json(envelope),
        OutputFormat::Table => table::print_table(envelope),
        OutputFormat::Csv => csv_out::print_csv(envelope),
        OutputFormat::Minimal => minimal::print_minimal(envelope),
    }
}
