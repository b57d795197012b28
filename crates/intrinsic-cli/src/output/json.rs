use serde_json::Value;
use std::io::{self, Write};

/// Pretty-print the envelope as JSON on stdout.
pub fn print_json(value: &Value) {
    let rendered = match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialise output");
            return;
        }
    };
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "{}", rendered);
}
