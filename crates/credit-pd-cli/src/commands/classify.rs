use clap::Args;
use serde_json::{json, Value};

use credit_pd_core::risk::classify;
use credit_pd_core::ScoringConfig;

#[derive(Args)]
pub struct ClassifyArgs {
    /// Probability of default in [0, 1]; the decision threshold comes from
    /// --config or CPD_DECISION_THRESHOLD
    #[arg(long, allow_hyphen_values = true)]
    pub pd: f64,
}

pub fn run_classify(
    args: ClassifyArgs,
    config: &ScoringConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let classification = classify(args.pd, config)?;
    Ok(json!({ "result": classification }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_follows_configured_threshold() {
        let config = ScoringConfig {
            decision_threshold: 0.5,
            ..ScoringConfig::default()
        };
        let out = run_classify(ClassifyArgs { pd: 0.3 }, &config).unwrap();
        assert_eq!(out["result"]["predicted_label"], "Non-Default");
        assert_eq!(out["result"]["decision_threshold"], 0.5);
        assert_eq!(out["result"]["rating"], "CCC-D");
    }

    #[test]
    fn test_nan_pd_has_no_label() {
        let out = run_classify(ClassifyArgs { pd: f64::NAN }, &ScoringConfig::default()).unwrap();
        assert!(out["result"]["predicted_label"].is_null());
        assert_eq!(out["result"]["tier"], "Undetermined");
    }

    #[test]
    fn test_out_of_range_pd_is_an_error() {
        assert!(run_classify(ClassifyArgs { pd: 1.5 }, &ScoringConfig::default()).is_err());
    }
}
