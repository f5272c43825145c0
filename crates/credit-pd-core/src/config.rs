//! Scoring configuration.
//!
//! Every tunable constant of the pipeline lives here: the decision threshold,
//! the split/seed used for fitting and the hyperparameters of the three base
//! learners.
//!
//! ```rust,ignore
//! use credit_pd_core::config::ScoringConfig;
//!
//! let config = ScoringConfig::from_file("scoring.toml")?.with_env_overrides();
//! config.validate()?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CreditPdError;
use crate::risk::decision::DEFAULT_DECISION_THRESHOLD;
use crate::CreditPdResult;

/// Logistic regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    /// Inverse L2 regularisation strength.
    pub c: f64,
    /// Maximum Newton iterations.
    pub max_iter: u32,
    /// Stop when the largest coefficient update falls below this.
    pub tolerance: f64,
    /// Reweight classes inversely to their frequency.
    pub class_balanced: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tolerance: 1e-8,
            class_balanced: true,
        }
    }
}

impl LogisticParams {
    /// Meta-model settings: same solver, no class reweighting.
    pub fn meta() -> Self {
        Self {
            class_balanced: false,
            ..Self::default()
        }
    }
}

/// Random forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split. `None` means sqrt(n_features).
    pub max_features: Option<usize>,
    pub class_balanced: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            class_balanced: true,
        }
    }
}

/// Gradient boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// Minimum hessian sum per child.
    pub min_child_weight: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 6,
            learning_rate: 0.1,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

/// Top-level scoring configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// PD at or above which a borrower is labelled "Default".
    pub decision_threshold: f64,
    pub random_seed: u64,
    /// Share of the dataset held out for the test split.
    pub test_fraction: f64,
    /// Folds used to build the meta-model's training features.
    pub cv_folds: usize,
    /// Train/test AUC gap above which the training report warns of overfitting.
    pub max_auc_gap: f64,
    pub logistic: LogisticParams,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            decision_threshold: DEFAULT_DECISION_THRESHOLD,
            random_seed: 42,
            test_fraction: 0.2,
            cv_folds: 5,
            max_auc_gap: 0.10,
            logistic: LogisticParams::default(),
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

impl ScoringConfig {
    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> CreditPdResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            CreditPdError::ConfigError(format!(
                "Failed to read config '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> CreditPdResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults overridden by `CPD_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `CPD_*` environment overrides. Unparsable values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        override_from_env("CPD_DECISION_THRESHOLD", &mut self.decision_threshold);
        override_from_env("CPD_RANDOM_SEED", &mut self.random_seed);
        override_from_env("CPD_TEST_FRACTION", &mut self.test_fraction);
        override_from_env("CPD_CV_FOLDS", &mut self.cv_folds);
        override_from_env("CPD_MAX_AUC_GAP", &mut self.max_auc_gap);
        override_from_env("CPD_FOREST_TREES", &mut self.forest.n_estimators);
        override_from_env("CPD_BOOSTING_ROUNDS", &mut self.boosting.n_estimators);
        self
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> CreditPdResult<String> {
        toml::to_string_pretty(self).map_err(|e| CreditPdError::ConfigError(e.to_string()))
    }

    pub fn validate(&self) -> CreditPdResult<()> {
        if !(self.decision_threshold > 0.0 && self.decision_threshold < 1.0) {
            return Err(invalid("decision_threshold", "Must lie strictly between 0 and 1."));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(invalid("test_fraction", "Must lie strictly between 0 and 1."));
        }
        if self.cv_folds < 2 {
            return Err(invalid("cv_folds", "At least 2 folds are required."));
        }
        if self.max_auc_gap < 0.0 {
            return Err(invalid("max_auc_gap", "Cannot be negative."));
        }
        if self.logistic.c <= 0.0 {
            return Err(invalid("logistic.c", "Regularisation strength must be positive."));
        }
        if self.logistic.max_iter == 0 {
            return Err(invalid("logistic.max_iter", "Must be at least 1."));
        }
        if self.forest.n_estimators == 0 {
            return Err(invalid("forest.n_estimators", "Must be at least 1."));
        }
        if self.forest.min_samples_leaf == 0 || self.forest.min_samples_split < 2 {
            return Err(invalid(
                "forest.min_samples_split",
                "Leaves need at least 1 sample and splits at least 2.",
            ));
        }
        if self.forest.max_features == Some(0) {
            return Err(invalid("forest.max_features", "Must be at least 1."));
        }
        if self.boosting.n_estimators == 0 {
            return Err(invalid("boosting.n_estimators", "Must be at least 1."));
        }
        if !(self.boosting.learning_rate > 0.0 && self.boosting.learning_rate <= 1.0) {
            return Err(invalid("boosting.learning_rate", "Must lie in (0, 1]."));
        }
        if self.boosting.lambda < 0.0 || self.boosting.min_child_weight < 0.0 {
            return Err(invalid(
                "boosting.lambda",
                "Leaf penalty and minimum child weight cannot be negative.",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> CreditPdError {
    CreditPdError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.trim().parse() {
            Ok(v) => *target = v,
            Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable override"),
        }
    }
}
