pub mod decision;
pub mod tier;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::error::CreditPdError;
use crate::CreditPdResult;
use decision::{label_pd, PredictedLabel};
use tier::{classify_pd, TierProfile};

/// Tier and hard label of a single PD under the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdClassification {
    /// `None` when the PD was not finite.
    pub pd: Option<f64>,
    #[serde(flatten)]
    pub tier: TierProfile,
    /// `None` when the PD was not finite.
    pub predicted_label: Option<PredictedLabel>,
    pub decision_threshold: f64,
}

/// Classify a PD with `config.decision_threshold`. A non-finite PD is
/// [`tier::RiskTier::Undetermined`] with no label; a finite PD outside
/// `[0, 1]` is rejected.
pub fn classify(pd: f64, config: &ScoringConfig) -> CreditPdResult<PdClassification> {
    if pd.is_finite() && !(0.0..=1.0).contains(&pd) {
        return Err(CreditPdError::InvalidInput {
            field: "pd".into(),
            reason: format!("Must lie in [0, 1], got {pd}."),
        });
    }
    let pd = Some(pd).filter(|p| p.is_finite());
    let threshold = config.decision_threshold;
    Ok(PdClassification {
        pd,
        tier: classify_pd(pd).profile(),
        predicted_label: label_pd(pd, threshold),
        decision_threshold: threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::tier::RiskTier;

    #[test]
    fn test_classify_uses_configured_threshold() {
        let config = ScoringConfig {
            decision_threshold: 0.30,
            ..ScoringConfig::default()
        };
        let c = classify(0.25, &config).unwrap();
        assert_eq!(c.tier.tier, RiskTier::CccD);
        assert_eq!(c.predicted_label, Some(PredictedLabel::NonDefault));
        assert_eq!(c.decision_threshold, 0.30);

        let c = classify(0.15, &ScoringConfig::default()).unwrap();
        assert_eq!(c.predicted_label, Some(PredictedLabel::Default));
    }

    #[test]
    fn test_nan_is_undetermined_without_label() {
        for pd in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let c = classify(pd, &ScoringConfig::default()).unwrap();
            assert_eq!(c.pd, None);
            assert_eq!(c.tier.tier, RiskTier::Undetermined);
            assert_eq!(c.predicted_label, None);
        }
    }

    #[test]
    fn test_nan_serializes_null_label() {
        let c = classify(f64::NAN, &ScoringConfig::default()).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert!(json["predicted_label"].is_null());
        assert!(json["pd"].is_null());
        assert_eq!(json["rating"], "N/A");
    }

    #[test]
    fn test_out_of_range_pd_rejected() {
        assert!(matches!(
            classify(1.2, &ScoringConfig::default()),
            Err(CreditPdError::InvalidInput { .. })
        ));
        assert!(classify(-0.01, &ScoringConfig::default()).is_err());
    }
}
