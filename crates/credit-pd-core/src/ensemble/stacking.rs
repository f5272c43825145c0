//! Stacked generalisation over the three base learners.
//!
//! The meta-model is trained on out-of-fold default probabilities: for each
//! of `k` stratified folds the base learners are fitted on the other folds and
//! score the held-out rows. The base learners used at prediction time are then
//! refitted on every row.

use serde::{Deserialize, Serialize};

use super::boosting::GradientBoosting;
use super::dataset::stratified_folds;
use super::features::Features;
use super::forest::RandomForest;
use super::logistic::LogisticRegression;
use super::ProbabilisticClassifier;
use crate::config::{LogisticParams, ScoringConfig};
use crate::error::CreditPdError;
use crate::CreditPdResult;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Base-model probabilities in meta-feature order.
pub type BaseProbabilities = [f64; 3];

/// One fitted instance of each base learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseModels {
    pub logistic: LogisticRegression,
    pub random_forest: RandomForest,
    pub gradient_boosting: GradientBoosting,
}

impl BaseModels {
    pub fn fit(x: &[Features], y: &[u8], config: &ScoringConfig) -> CreditPdResult<Self> {
        Ok(Self {
            logistic: LogisticRegression::fit(x, y, &config.logistic)?,
            random_forest: RandomForest::fit(x, y, &config.forest, config.random_seed)?,
            gradient_boosting: GradientBoosting::fit(x, y, &config.boosting)?,
        })
    }

    pub fn predict(&self, x: &[f64]) -> BaseProbabilities {
        [
            self.logistic.predict_proba(x),
            self.random_forest.predict_proba(x),
            self.gradient_boosting.predict_proba(x),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackingClassifier {
    base: BaseModels,
    meta: LogisticRegression,
}

impl StackingClassifier {
    pub fn fit(x: &[Features], y: &[u8], config: &ScoringConfig) -> CreditPdResult<Self> {
        let folds = config.cv_folds.min(x.len());
        if folds < 2 {
            return Err(CreditPdError::InsufficientData(format!(
                "stacking needs at least 2 folds, have {folds}"
            )));
        }

        let oof = out_of_fold_probabilities(x, y, folds, config)?;
        let meta = LogisticRegression::fit(&oof, y, &LogisticParams::meta())?;
        tracing::debug!(
            weights = ?meta.coefficients,
            intercept = meta.intercept,
            "meta-model fitted"
        );

        let base = BaseModels::fit(x, y, config)?;
        Ok(Self { base, meta })
    }

    pub fn base(&self) -> &BaseModels {
        &self.base
    }

    pub fn meta(&self) -> &LogisticRegression {
        &self.meta
    }
}

impl ProbabilisticClassifier for StackingClassifier {
    fn name(&self) -> &'static str {
        "stacking"
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        self.meta.predict_proba(&self.base.predict(x))
    }
}

/// Held-out base probabilities for every row.
fn out_of_fold_probabilities(
    x: &[Features],
    y: &[u8],
    folds: usize,
    config: &ScoringConfig,
) -> CreditPdResult<Vec<BaseProbabilities>> {
    let assignment = stratified_folds(y, folds);

    let fit_fold = |fold: usize| -> CreditPdResult<Vec<(usize, BaseProbabilities)>> {
        let (train_rows, held_out): (Vec<usize>, Vec<usize>) =
            (0..x.len()).partition(|&i| assignment[i] != fold);
        if held_out.is_empty() {
            return Ok(Vec::new());
        }
        let fx: Vec<Features> = train_rows.iter().map(|&i| x[i]).collect();
        let fy: Vec<u8> = train_rows.iter().map(|&i| y[i]).collect();
        let models = BaseModels::fit(&fx, &fy, config)?;
        tracing::debug!(fold, train = fx.len(), held_out = held_out.len(), "cv fold fitted");
        Ok(held_out
            .into_iter()
            .map(|i| (i, models.predict(&x[i])))
            .collect())
    };

    #[cfg(feature = "parallel")]
    let per_fold: Vec<CreditPdResult<Vec<(usize, BaseProbabilities)>>> =
        (0..folds).into_par_iter().map(fit_fold).collect();
    #[cfg(not(feature = "parallel"))]
    let per_fold: Vec<CreditPdResult<Vec<(usize, BaseProbabilities)>>> =
        (0..folds).map(fit_fold).collect();

    let mut oof = vec![[0.0; 3]; x.len()];
    for fold in per_fold {
        for (i, probs) in fold? {
            oof[i] = probs;
        }
    }
    Ok(oof)
}
