use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::features::{Features, FEATURE_COUNT};
use super::tree::{DecisionTree, Gini, TreeParams};
use super::ProbabilisticClassifier;
use crate::config::ForestParams;
use crate::error::CreditPdError;
use crate::CreditPdResult;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Bootstrap-bagged Gini trees. The default probability is the mean of the
/// trees' leaf default shares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(
        x: &[Features],
        y: &[u8],
        params: &ForestParams,
        seed: u64,
    ) -> CreditPdResult<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(CreditPdError::InvalidInput {
                field: "forest.x".into(),
                reason: format!("{} rows for {} labels", x.len(), y.len()),
            });
        }
        if params.n_estimators == 0 {
            return Err(CreditPdError::InvalidInput {
                field: "forest.n_estimators".into(),
                reason: "At least one tree is required.".into(),
            });
        }

        let weights = class_weights(y, params.class_balanced);
        let targets: Vec<f64> = y
            .iter()
            .zip(&weights)
            .map(|(label, w)| f64::from(*label) * w)
            .collect();
        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: Some(
                params
                    .max_features
                    .unwrap_or_else(|| (FEATURE_COUNT as f64).sqrt().floor() as usize),
            ),
        };

        let grow = |i: usize| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            let n = x.len();
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            DecisionTree::fit(x, &targets, &weights, rows, tree_params, &Gini, &mut rng)
        };

        #[cfg(feature = "parallel")]
        let trees: Vec<DecisionTree> = (0..params.n_estimators).into_par_iter().map(grow).collect();
        #[cfg(not(feature = "parallel"))]
        let trees: Vec<DecisionTree> = (0..params.n_estimators).map(grow).collect();

        tracing::debug!(trees = trees.len(), "random forest fitted");
        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl ProbabilisticClassifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn predict_proba(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        (total / self.trees.len() as f64).clamp(0.0, 1.0)
    }
}

/// Per-row weights; balanced weighting gives each class half the total mass.
/// Computed once on the full fitting set, before bootstrap resampling.
fn class_weights(y: &[u8], balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; y.len()];
    }
    let n = y.len() as f64;
    let positives = y.iter().filter(|v| **v == 1).count();
    let negatives = y.len() - positives;
    let weight = |count: usize| if count == 0 { 0.0 } else { n / (2.0 * count as f64) };
    let (w_pos, w_neg) = (weight(positives), weight(negatives));
    y.iter()
        .map(|v| if *v == 1 { w_pos } else { w_neg })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n: usize) -> (Vec<Features>, Vec<u8>) {
        let x = (0..n)
            .map(|i| {
                let mut f = [0.0; FEATURE_COUNT];
                for (j, v) in f.iter_mut().enumerate() {
                    *v = (i * (j + 1)) as f64 % 7.0;
                }
                f[0] = i as f64;
                f
            })
            .collect();
        let y = (0..n).map(|i| u8::from(i >= n / 2)).collect();
        (x, y)
    }

    fn small() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        }
    }

    #[test]
    fn test_balanced_weights_equalise_class_mass() {
        let y = [0, 0, 0, 1];
        let w = class_weights(&y, true);
        let neg: f64 = w[..3].iter().sum();
        assert!((neg - w[3]).abs() < 1e-12);
        assert_eq!(class_weights(&y, false), vec![1.0; 4]);
    }

    #[test]
    fn test_forest_orders_classes() {
        let (x, y) = separable(40);
        let forest = RandomForest::fit(&x, &y, &small(), 42).unwrap();
        assert_eq!(forest.n_trees(), 15);
        let low = forest.predict_proba(&x[2]);
        let high = forest.predict_proba(&x[37]);
        assert!(high > low, "high {high} low {low}");
        assert!((0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high));
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (x, y) = separable(30);
        let a = RandomForest::fit(&x, &y, &small(), 7).unwrap();
        let b = RandomForest::fit(&x, &y, &small(), 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_trees_rejected() {
        let (x, y) = separable(10);
        let params = ForestParams {
            n_estimators: 0,
            ..ForestParams::default()
        };
        assert!(RandomForest::fit(&x, &y, &params, 1).is_err());
    }
}
