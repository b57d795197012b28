use serde_json::{Map, Value};

/// Headline fields, in priority order. The first one present wins.
const HEADLINE_KEYS: [&str; 5] = [
    "intrinsic_value",
    "base_case_value",
    "wacc",
    "rating",
    "suggested_model",
];

/// Print just the headline answer: value per share, WACC, rating or
/// suggested model depending on the command.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Object(map) => println!("{}", headline(map)),
        other => println!("{}", format_minimal(other)),
    }
}

fn headline(map: &Map<String, Value>) -> String {
    for key in HEADLINE_KEYS {
        match map.get(key) {
            Some(Value::Null) | None => continue,
            Some(val) => {
                // A rating is only meaningful with its spread
                if key == "rating" {
                    if let Some(spread) = map.get("spread") {
                        return format!("{} {}", format_minimal(val), format_minimal(spread));
                    }
                }
                return format_minimal(val);
            }
        }
    }
    map.iter()
        .next()
        .map(|(key, val)| format!("{}: {}", key, format_minimal(val)))
        .unwrap_or_default()
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_value_headline() {
        let m = result_map(json!({ "model": "FCFF", "intrinsic_value": "27.81", "wacc": "0.09" }));
        assert_eq!(headline(&m), "27.81");
    }

    #[test]
    fn test_rating_with_spread() {
        let m = result_map(json!({ "coverage": "3.2", "rating": "A-", "spread": "0.0122" }));
        assert_eq!(headline(&m), "A- 0.0122");
    }

    #[test]
    fn test_null_headline_skipped() {
        let m = result_map(json!({ "base_case_value": null, "wacc": "0.085" }));
        assert_eq!(headline(&m), "0.085");
    }

    #[test]
    fn test_fallback_to_first_field() {
        let m = result_map(json!({ "model": "DDM", "ticker": "X" }));
        assert_eq!(headline(&m), "model: DDM");
    }
}
