//! Feature schema shared by training files, prediction requests and the
//! extracted ratio vector.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CreditPdError;
use crate::CreditPdResult;

pub const FEATURE_COUNT: usize = 14;

/// Column names, in model order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "X_1", "X_2", "X_3", "X_4", "X_5", "X_6", "X_7", "X_8", "X_9", "X_10", "X_11", "X_12", "X_13",
    "X_14",
];

/// One observation in model order.
pub type Features = [f64; FEATURE_COUNT];

/// Named feature values as they arrive from callers. Extra keys are ignored;
/// absent ones are a schema mismatch.
pub type FeatureRow = BTreeMap<String, f64>;

/// Order a named row into model features.
pub fn features_from_row(row: &FeatureRow) -> CreditPdResult<Features> {
    let missing: Vec<String> = FEATURE_NAMES
        .iter()
        .filter(|name| !row.contains_key(**name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(CreditPdError::FeatureSchemaMismatch { missing });
    }

    let mut features = [0.0; FEATURE_COUNT];
    for (slot, name) in features.iter_mut().zip(FEATURE_NAMES) {
        *slot = row[name];
    }
    check_finite(&features)?;
    Ok(features)
}

pub fn features_to_row(features: &Features) -> FeatureRow {
    FEATURE_NAMES
        .iter()
        .zip(features.iter())
        .map(|(name, v)| (name.to_string(), *v))
        .collect()
}

/// Reject NaN and infinities, naming the first offending feature.
pub fn check_finite(features: &Features) -> CreditPdResult<()> {
    match features.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(CreditPdError::NonFiniteFeature {
            feature: FEATURE_NAMES[idx].to_string(),
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Prediction request
// ---------------------------------------------------------------------------

/// Strict prediction payload: exactly the fourteen ratio fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionRequest {
    #[serde(rename = "X_1")]
    pub x1: f64,
    #[serde(rename = "X_2")]
    pub x2: f64,
    #[serde(rename = "X_3")]
    pub x3: f64,
    #[serde(rename = "X_4")]
    pub x4: f64,
    #[serde(rename = "X_5")]
    pub x5: f64,
    #[serde(rename = "X_6")]
    pub x6: f64,
    #[serde(rename = "X_7")]
    pub x7: f64,
    #[serde(rename = "X_8")]
    pub x8: f64,
    #[serde(rename = "X_9")]
    pub x9: f64,
    #[serde(rename = "X_10")]
    pub x10: f64,
    #[serde(rename = "X_11")]
    pub x11: f64,
    #[serde(rename = "X_12")]
    pub x12: f64,
    #[serde(rename = "X_13")]
    pub x13: f64,
    #[serde(rename = "X_14")]
    pub x14: f64,
}

impl PredictionRequest {
    pub fn features(&self) -> Features {
        [
            self.x1, self.x2, self.x3, self.x4, self.x5, self.x6, self.x7, self.x8, self.x9,
            self.x10, self.x11, self.x12, self.x13, self.x14,
        ]
    }

    pub fn from_features(f: &Features) -> Self {
        Self {
            x1: f[0],
            x2: f[1],
            x3: f[2],
            x4: f[3],
            x5: f[4],
            x6: f[5],
            x7: f[6],
            x8: f[7],
            x9: f[8],
            x10: f[9],
            x11: f[10],
            x12: f[11],
            x13: f[12],
            x14: f[13],
        }
    }

    pub fn to_row(&self) -> FeatureRow {
        features_to_row(&self.features())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_row() -> FeatureRow {
        FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as f64))
            .collect()
    }

    #[test]
    fn test_row_ordered_by_feature_name_not_map_order() {
        // BTreeMap orders X_10 before X_2; model order must not follow it.
        let f = features_from_row(&full_row()).unwrap();
        assert_eq!(f[1], 1.0);
        assert_eq!(f[9], 9.0);
        assert_eq!(f[13], 13.0);
    }

    #[test]
    fn test_missing_columns_listed() {
        let mut row = full_row();
        row.remove("X_3");
        row.remove("X_14");
        match features_from_row(&row).unwrap_err() {
            CreditPdError::FeatureSchemaMismatch { missing } => {
                assert_eq!(missing, vec!["X_3".to_string(), "X_14".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_columns_ignored_in_rows() {
        let mut row = full_row();
        row.insert("company".into(), 1.0);
        assert!(features_from_row(&row).is_ok());
    }

    #[test]
    fn test_non_finite_named() {
        let mut row = full_row();
        row.insert("X_7".into(), f64::NAN);
        match features_from_row(&row).unwrap_err() {
            CreditPdError::NonFiniteFeature { feature } => assert_eq!(feature, "X_7"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        let mut value = serde_json::to_value(full_row()).unwrap();
        value["X_15"] = serde_json::json!(1.0);
        assert!(serde_json::from_value::<PredictionRequest>(value).is_err());
    }

    #[test]
    fn test_request_requires_every_field() {
        let mut row = full_row();
        row.remove("X_5");
        let value = serde_json::to_value(row).unwrap();
        assert!(serde_json::from_value::<PredictionRequest>(value).is_err());
    }

    #[test]
    fn test_request_features_in_order() {
        let value = serde_json::to_value(full_row()).unwrap();
        let req: PredictionRequest = serde_json::from_value(value).unwrap();
        assert_eq!(req.features()[13], 13.0);
        assert_eq!(PredictionRequest::from_features(&req.features()), req);
    }
}
