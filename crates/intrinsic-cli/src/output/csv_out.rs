use serde_json::Value;
use std::io;

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            if let Some(Value::Object(result)) = map.get("result") {
                if let Some(Value::Array(matrix)) = result.get("matrix") {
                    write_grid_csv(&mut wtr, result, matrix);
                } else if let Some(Value::Array(rows)) = result.get("projections") {
                    // Year-by-year schedule
                    write_array_csv(&mut wtr, rows);
                } else {
                    // Two-column CSV: field, value
                    let _ = wtr.write_record(["field", "value"]);
                    for (key, val) in result {
                        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                    }
                }
            } else {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
                }
            }
        }
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        map.get(*h)
                            .map(format_csv_value)
                            .unwrap_or_default()
                    })
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

/// Sensitivity grid: one row per variable_1 value, one column per variable_2 value.
fn write_grid_csv(
    wtr: &mut csv::Writer<io::StdoutLock<'_>>,
    result: &serde_json::Map<String, Value>,
    matrix: &[Value],
) {
    let values = |key: &str| match result.get(key) {
        Some(Value::Array(vs)) => vs.iter().map(format_csv_value).collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    let corner = result.get("variable_1").map(format_csv_value).unwrap_or_default();

    let mut header = vec![corner];
    header.extend(values("variable_2_values"));
    let _ = wtr.write_record(&header);

    for (row_label, row) in values("variable_1_values").into_iter().zip(matrix) {
        let mut record = vec![row_label];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
