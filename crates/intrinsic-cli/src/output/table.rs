use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) if res_map.contains_key("matrix") => print_grid(res_map),
        Value::Object(res_map) => {
            print_flat_object(res_map);
            // Schedules such as the projection years get their own table
            for (key, val) in res_map {
                if let Value::Array(rows) = val {
                    if matches!(rows.first(), Some(Value::Object(_))) {
                        println!("\n{}:", key);
                        print_array_table(rows);
                    }
                }
            }
        }
        _ => print_flat_object(envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if is_object_rows(val) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

/// Sensitivity grid: variable_1 down the rows, variable_2 across the columns.
fn print_grid(res_map: &Map<String, Value>) {
    let label = |key: &str| {
        res_map
            .get(key)
            .map(format_value)
            .unwrap_or_default()
    };
    let values = |key: &str| match res_map.get(key) {
        Some(Value::Array(vs)) => vs.iter().map(format_value).collect::<Vec<_>>(),
        _ => Vec::new(),
    };

    let mut builder = Builder::default();
    let mut header = vec![format!("{} \\ {}", label("variable_1"), label("variable_2"))];
    header.extend(values("variable_2_values"));
    builder.push_record(header);

    let row_labels = values("variable_1_values");
    if let Some(Value::Array(rows)) = res_map.get("matrix") {
        for (row_label, row) in row_labels.iter().zip(rows) {
            let mut record = vec![row_label.clone()];
            if let Value::Array(cells) = row {
                record.extend(cells.iter().map(format_value));
            }
            builder.push_record(record);
        }
    }
    println!("{}", Table::from(builder));
    println!("\nBase case: {}", label("base_case_value"));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn is_object_rows(value: &Value) -> bool {
    matches!(value, Value::Array(rows) if matches!(rows.first(), Some(Value::Object(_))))
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
