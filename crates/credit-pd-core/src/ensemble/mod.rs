//! Stacked ensemble probability-of-default scorer.
//!
//! Three base learners (logistic regression, random forest, gradient-boosted
//! trees) are combined by a logistic meta-model trained on their out-of-fold
//! predictions. A second, independently fitted set of base learners supplies
//! the per-model PDs shown alongside the stacked PD.

pub mod boosting;
pub mod dataset;
pub mod features;
pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod model;
pub mod stacking;
pub mod tree;

pub use dataset::TrainingDataset;
pub use features::{FeatureRow, Features, PredictionRequest, FEATURE_NAMES};
pub use model::{EnsembleModel, ScoreOutput, TrainingReport};

/// A fitted binary classifier that outputs the probability of class 1.
pub trait ProbabilisticClassifier {
    fn name(&self) -> &'static str;

    fn predict_proba(&self, x: &[f64]) -> f64;
}
