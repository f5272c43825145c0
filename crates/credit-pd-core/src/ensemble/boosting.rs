//! Gradient-boosted trees on logistic loss.
//!
//! The margin starts at zero (probability 0.5). Each round fits one tree to
//! the gradient `p − y` and hessian `p(1 − p)` of the current margin and adds
//! its shrunken leaf weights.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::features::Features;
use super::logistic::sigmoid;
use super::tree::{DecisionTree, SecondOrder, TreeParams};
use super::ProbabilisticClassifier;
use crate::config::BoostingParams;
use crate::error::CreditPdError;
use crate::CreditPdResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    learning_rate: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    pub fn fit(x: &[Features], y: &[u8], params: &BoostingParams) -> CreditPdResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(CreditPdError::InvalidInput {
                field: "boosting.x".into(),
                reason: format!("{} rows for {} labels", x.len(), y.len()),
            });
        }
        if params.learning_rate <= 0.0 || params.lambda < 0.0 {
            return Err(CreditPdError::InvalidInput {
                field: "boosting".into(),
                reason: "learning_rate must be positive and lambda non-negative.".into(),
            });
        }

        let criterion = SecondOrder {
            lambda: params.lambda,
            min_child_weight: params.min_child_weight,
        };
        let tree_params = TreeParams {
            max_depth: Some(params.max_depth),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        };
        // Unused while every feature is tried at each split.
        let mut rng = StdRng::seed_from_u64(0);

        let n = x.len();
        let mut margin = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let mut gradient = Vec::with_capacity(n);
            let mut hessian = Vec::with_capacity(n);
            for (m, label) in margin.iter().zip(y) {
                let p = sigmoid(*m);
                gradient.push(p - f64::from(*label));
                hessian.push(p * (1.0 - p));
            }
            let tree = DecisionTree::fit(
                x,
                &gradient,
                &hessian,
                (0..n).collect(),
                tree_params,
                &criterion,
                &mut rng,
            );
            for (m, row) in margin.iter_mut().zip(x) {
                *m += params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        tracing::debug!(rounds = trees.len(), "gradient boosting fitted");
        Ok(Self {
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn margin(&self, x: &[f64]) -> f64 {
        self.trees
            .iter()
            .map(|t| self.learning_rate * t.predict(x))
            .sum()
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }
}

impl ProbabilisticClassifier for GradientBoosting {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.margin(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::features::FEATURE_COUNT;

    fn data() -> (Vec<Features>, Vec<u8>) {
        let x = (0..40)
            .map(|i| {
                let mut f = [0.0; FEATURE_COUNT];
                f[3] = i as f64;
                f
            })
            .collect();
        let y = (0..40).map(|i| u8::from(i >= 25)).collect();
        (x, y)
    }

    #[test]
    fn test_zero_rounds_is_coin_flip() {
        let (x, y) = data();
        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::default()
        };
        let model = GradientBoosting::fit(&x, &y, &params).unwrap();
        assert_eq!(model.predict_proba(&x[0]), 0.5);
    }

    #[test]
    fn test_boosting_separates_classes() {
        let (x, y) = data();
        let params = BoostingParams {
            n_estimators: 30,
            ..BoostingParams::default()
        };
        let model = GradientBoosting::fit(&x, &y, &params).unwrap();
        assert_eq!(model.n_rounds(), 30);
        assert!(model.predict_proba(&x[39]) > 0.8);
        assert!(model.predict_proba(&x[0]) < 0.2);
    }

    #[test]
    fn test_more_rounds_fit_tighter() {
        let (x, y) = data();
        let few = GradientBoosting::fit(
            &x,
            &y,
            &BoostingParams {
                n_estimators: 5,
                ..BoostingParams::default()
            },
        )
        .unwrap();
        let many = GradientBoosting::fit(
            &x,
            &y,
            &BoostingParams {
                n_estimators: 40,
                ..BoostingParams::default()
            },
        )
        .unwrap();
        assert!(many.predict_proba(&x[39]) > few.predict_proba(&x[39]));
    }
}
