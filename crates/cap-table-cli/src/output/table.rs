use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Columns shown for each class of a waterfall result.
const DISTRIBUTION_COLUMNS: [(&str, &str); 8] = [
    ("class_name", "Class"),
    ("class_kind", "Kind"),
    ("shares", "Shares"),
    ("liquidation_preference", "Preference"),
    ("cumulative_dividends", "Dividends"),
    ("participation", "Participation"),
    ("common_distribution", "Common"),
    ("total_distribution", "Total"),
];

const STEP_COLUMNS: [(&str, &str); 4] = [
    ("step", "Step"),
    ("description", "Description"),
    ("amount", "Amount"),
    ("remaining", "Remaining"),
];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
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

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    match result {
        Value::Object(res_map) if res_map.contains_key("distributions") => {
            print_waterfall(result);
        }
        Value::Object(res_map) => {
            let mut builder = Builder::default();
            builder.push_record(["Field", "Value"]);
            for (key, val) in res_map {
                if let Value::Array(rows) = val {
                    if rows.first().map(Value::is_object).unwrap_or(false) {
                        continue;
                    }
                }
                builder.push_record([key.as_str(), &format_value(val)]);
            }
            println!("{}", Table::from(builder));

            // Row collections (coverage rows, breakeven points, scenarios)
            for (key, val) in res_map {
                if let Value::Array(rows) = val {
                    if rows.first().map(Value::is_object).unwrap_or(false) {
                        println!("\n{}:", key);
                        print_array_table(rows);
                    }
                }
            }
        }
        _ => print_flat_object(&Value::Object(envelope.clone())),
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

/// Distribution table followed by the step log.
fn print_waterfall(result: &Value) {
    if let Some(Value::Array(distributions)) = result.get("distributions") {
        println!("{}", columns_table(distributions, &DISTRIBUTION_COLUMNS));
    }
    if let Some(summary) = result.get("summary") {
        if let Some(Value::Array(steps)) = summary.get("steps") {
            println!("\nSteps:");
            println!("{}", columns_table(steps, &STEP_COLUMNS));
        }
        for key in ["total_distributed", "undistributed"] {
            if let Some(val) = summary.get(key) {
                println!("{}: {}", key, format_value(val));
            }
        }
    }
}

fn columns_table(rows: &[Value], columns: &[(&str, &str)]) -> Table {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().map(|(_, header)| header.to_string()));
    for row in rows {
        builder.push_record(
            columns
                .iter()
                .map(|(key, _)| row.get(*key).map(format_value).unwrap_or_default()),
        );
    }
    Table::from(builder)
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

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

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_columns_table_selects_fields() {
        let rows = vec![json!({
            "step": 1,
            "description": "Series A liquidation preference (1x)",
            "amount": "100000000",
            "remaining": "0",
            "ignored": true
        })];
        let rendered = columns_table(&rows, &STEP_COLUMNS).to_string();
        assert!(rendered.contains("Series A liquidation preference (1x)"));
        assert!(rendered.contains("Remaining"));
        assert!(!rendered.contains("ignored"));
    }

    #[test]
    fn test_format_value_joins_arrays() {
        assert_eq!(format_value(&json!(["a", 1, null])), "a, 1, null");
    }
}
