use serde_json::Value;
use std::io;

use super::{flatten, result_of};

/// Write the flattened result as `field,value` CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in flatten(result_of(value)) {
        let _ = wtr.write_record([key, val]);
    }
    if let Some(Value::Array(warnings)) = value.get("warnings") {
        for w in warnings.iter().filter_map(Value::as_str) {
            let _ = wtr.write_record(["warning", w]);
        }
    }

    let _ = wtr.flush();
}
