use colored::Colorize;
use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten, result_of};

/// Print the result as a two-column field/value table, followed by warnings
/// and commentary from the envelope.
pub fn print_table(value: &Value) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten(result_of(value)) {
        builder.push_record([key, val]);
    }
    println!("{}", Table::from(builder));

    let envelope = match value.as_object() {
        Some(m) => m,
        None => return,
    };

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::Object(commentary)) = envelope.get("commentary") {
        if let Some(text) = commentary.get("text").and_then(Value::as_str) {
            println!("\nCommentary: {}", text);
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}
