use serde_json::Value;

use super::{cell, flatten, result_of};

/// Fields printed by `--output minimal`, most specific first.
const PRIORITY_KEYS: [&str; 6] = [
    "score.pd_stacking",
    "pd_stacking",
    "metrics_test.auc",
    "rating",
    "tier.rating",
    "predicted_label",
];

/// Print just the headline value of the output.
pub fn print_minimal(value: &Value) {
    let flat = flatten(result_of(value));
    for key in PRIORITY_KEYS {
        if let Some((_, v)) = flat.iter().find(|(k, v)| k == key && v != "N/A") {
            println!("{}", v);
            return;
        }
    }

    match flat.first() {
        Some((key, val)) => println!("{}: {}", key, val),
        None => println!("{}", cell(value)),
    }
}
