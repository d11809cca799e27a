use std::io::Read;

use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => match error_code {
            Some(code) => eprintln!("Error [{}]: {}", code, message),
            None => eprintln!("Error: {}", message),
        },
    }
    Ok(())
}

/// Print an API payload: raw JSON, or one line per record in text mode
pub fn output_value(output_format: &OutputFormat, value: &Value) -> anyhow::Result<()> {
    match (output_format, value) {
        (OutputFormat::Json, _) => println!("{}", serde_json::to_string_pretty(value)?),
        (OutputFormat::Text, Value::Array(rows)) if rows.is_empty() => println!("No records"),
        (OutputFormat::Text, Value::Array(rows)) => {
            for row in rows {
                println!("{}", summarize(row));
            }
            println!("{} record(s)", rows.len());
        }
        (OutputFormat::Text, Value::Object(map)) => {
            for (key, field) in map {
                match field {
                    Value::String(s) => println!("{}: {}", key, s),
                    other => println!("{}: {}", key, other),
                }
            }
        }
        (OutputFormat::Text, other) => println!("{}", other),
    }
    Ok(())
}

fn summarize(row: &Value) -> String {
    let id = row.get("id").map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    let label = ["name", "full_name", "business_name", "order_number", "subject", "title", "email"]
        .iter()
        .find_map(|key| row.get(*key).and_then(Value::as_str))
        .unwrap_or("");
    let status = row.get("status").and_then(Value::as_str).map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("#{} {}{}", id, label, status)
}

/// JSON body from `--data`, or stdin when absent
pub fn read_body(data: Option<String>) -> anyhow::Result<Value> {
    let raw = match data {
        Some(data) => data,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| anyhow::anyhow!("Invalid JSON body: {}", e))?;
    if !value.is_object() {
        anyhow::bail!("JSON body must be an object");
    }
    Ok(value)
}

/// Split `key=value` filter arguments
pub fn parse_pairs(pairs: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| anyhow::anyhow!("Expected key=value, got '{}'", pair))
        })
        .collect()
}
