use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Attempt to read JSON from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive) or empty.
pub fn read_stdin<T: DeserializeOwned>() -> Result<Option<T>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: T = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse stdin: {}", e))?;
    tracing::debug!(bytes = trimmed.len(), "read input from stdin");
    Ok(Some(value))
}

/// Load from `--<flag>` when given, otherwise from piped stdin.
pub fn file_or_stdin<T: DeserializeOwned>(
    path: Option<&str>,
    flag: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return super::file::read_input(path);
    }
    read_stdin()?.ok_or_else(|| format!("--{flag} is required (or pipe JSON on stdin)").into())
}
