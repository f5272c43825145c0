//! Hard default / non-default labelling.
//!
//! Every hard label in the crate goes through [`predict_label`], so the cutoff
//! can only differ between components if they are handed different thresholds.

use serde::{Deserialize, Serialize};

/// PD at or above which a borrower is labelled as defaulting.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictedLabel {
    #[serde(rename = "Non-Default")]
    NonDefault,
    Default,
}

impl PredictedLabel {
    /// Binary encoding used by training labels (1 = default).
    pub fn as_class(self) -> u8 {
        match self {
            PredictedLabel::NonDefault => 0,
            PredictedLabel::Default => 1,
        }
    }
}

impl std::fmt::Display for PredictedLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonDefault => write!(f, "Non-Default"),
            Self::Default => write!(f, "Default"),
        }
    }
}

/// Label a PD against the decision threshold. `pd >= threshold` is a default.
pub fn predict_label(pd: f64, threshold: f64) -> PredictedLabel {
    if pd >= threshold {
        PredictedLabel::Default
    } else {
        PredictedLabel::NonDefault
    }
}

/// [`predict_label`] for a PD that may be missing. No label is given for a
/// missing or non-finite PD.
pub fn label_pd(pd: Option<f64>, threshold: f64) -> Option<PredictedLabel> {
    pd.filter(|p| p.is_finite())
        .map(|p| predict_label(p, threshold))
}
