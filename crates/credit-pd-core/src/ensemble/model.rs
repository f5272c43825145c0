use serde::{Deserialize, Serialize};

use super::dataset::{stratified_split, TrainingDataset};
use super::features::{check_finite, features_from_row, FeatureRow, Features, PredictionRequest};
use super::metrics::{evaluate, hard_labels, roc_auc, ClassificationMetrics, ConfusionMatrix};
use super::stacking::{BaseModels, StackingClassifier};
use super::ProbabilisticClassifier;
use crate::config::ScoringConfig;
use crate::risk::decision::{predict_label, PredictedLabel};
use crate::types::Probability;
use crate::CreditPdResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Stacked PD, the three standalone base PDs and the hard label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    pub pd_stacking: Probability,
    pub pd_logistic: Probability,
    pub pd_random_forest: Probability,
    pub pd_gradient_boosting: Probability,
    pub predicted_label: PredictedLabel,
    pub decision_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandaloneAuc {
    pub logistic: Option<f64>,
    pub random_forest: Option<f64>,
    pub gradient_boosting: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_train: usize,
    pub n_test: usize,
    pub train_default_rate: f64,
    pub test_default_rate: f64,
    pub decision_threshold: f64,
    pub metrics_train: ClassificationMetrics,
    pub metrics_test: ClassificationMetrics,
    pub confusion_matrix_test: ConfusionMatrix,
    pub standalone_test_auc: StandaloneAuc,
    /// Train AUC minus test AUC.
    pub auc_gap: Option<f64>,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// EnsembleModel
// ---------------------------------------------------------------------------

/// A fitted scorer: the stack, an independent standalone set of base models
/// for display, and the decision threshold. Never mutated after fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleModel {
    stack: StackingClassifier,
    standalone: BaseModels,
    decision_threshold: f64,
    report: TrainingReport,
}

impl EnsembleModel {
    /// Split, fit the stack and the standalone models on the training side,
    /// and evaluate both sides.
    pub fn fit(dataset: &TrainingDataset, config: &ScoringConfig) -> CreditPdResult<Self> {
        config.validate()?;
        let (train, test) = stratified_split(dataset, config.test_fraction, config.random_seed)?;
        train.require_fold_coverage(config.cv_folds)?;
        tracing::info!(
            rows = dataset.len(),
            train = train.len(),
            test = test.len(),
            default_rate = dataset.default_rate(),
            "fitting ensemble"
        );

        let stack = StackingClassifier::fit(train.features(), train.labels(), config)?;
        tracing::info!("stacking classifier fitted");
        let standalone = BaseModels::fit(train.features(), train.labels(), config)?;
        tracing::info!("standalone base models fitted");

        let threshold = config.decision_threshold;
        let train_pd = batch(&stack, train.features());
        let test_pd = batch(&stack, test.features());
        let metrics_train = evaluate(train.labels(), &train_pd, threshold);
        let metrics_test = evaluate(test.labels(), &test_pd, threshold);
        let confusion_matrix_test =
            ConfusionMatrix::from_predictions(test.labels(), &hard_labels(&test_pd, threshold));

        let standalone_test_auc = StandaloneAuc {
            logistic: roc_auc(test.labels(), &batch(&standalone.logistic, test.features())),
            random_forest: roc_auc(
                test.labels(),
                &batch(&standalone.random_forest, test.features()),
            ),
            gradient_boosting: roc_auc(
                test.labels(),
                &batch(&standalone.gradient_boosting, test.features()),
            ),
        };

        let auc_gap = match (metrics_train.auc, metrics_test.auc) {
            (Some(tr), Some(te)) => Some(tr - te),
            _ => None,
        };
        let warnings: Vec<String> = overfitting_warning(auc_gap, config.max_auc_gap)
            .into_iter()
            .collect();

        let report = TrainingReport {
            n_train: train.len(),
            n_test: test.len(),
            train_default_rate: train.default_rate(),
            test_default_rate: test.default_rate(),
            decision_threshold: threshold,
            metrics_train,
            metrics_test,
            confusion_matrix_test,
            standalone_test_auc,
            auc_gap,
            warnings,
        };
        tracing::info!(
            auc_train = ?report.metrics_train.auc,
            auc_test = ?report.metrics_test.auc,
            "ensemble evaluated"
        );

        Ok(Self {
            stack,
            standalone,
            decision_threshold: threshold,
            report,
        })
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    /// Score a named feature row. Every `X_1..X_14` must be present and finite.
    pub fn score(&self, row: &FeatureRow) -> CreditPdResult<ScoreOutput> {
        let features = features_from_row(row)?;
        self.score_features(&features)
    }

    pub fn score_request(&self, request: &PredictionRequest) -> CreditPdResult<ScoreOutput> {
        self.score_features(&request.features())
    }

    pub fn score_features(&self, features: &Features) -> CreditPdResult<ScoreOutput> {
        check_finite(features)?;
        let pd_stacking = self.stack.predict_proba(features);
        let [pd_logistic, pd_random_forest, pd_gradient_boosting] =
            self.standalone.predict(features);
        Ok(ScoreOutput {
            pd_stacking,
            pd_logistic,
            pd_random_forest,
            pd_gradient_boosting,
            predicted_label: predict_label(pd_stacking, self.decision_threshold),
            decision_threshold: self.decision_threshold,
        })
    }
}

fn batch<M: ProbabilisticClassifier + ?Sized>(model: &M, rows: &[Features]) -> Vec<f64> {
    rows.iter().map(|r| model.predict_proba(r)).collect()
}

/// Warning text when train AUC beats test AUC by more than `limit`.
fn overfitting_warning(auc_gap: Option<f64>, limit: f64) -> Option<String> {
    let gap = auc_gap.filter(|g| *g > limit)?;
    tracing::warn!(gap, limit, "train/test AUC gap");
    Some(format!(
        "Train AUC exceeds test AUC by {gap:.4} (limit {limit:.2}); the model may be overfitting."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoostingParams, ForestParams};
    use crate::ensemble::features::{features_to_row, FEATURE_COUNT};
    use crate::error::CreditPdError;

    fn quick_config() -> ScoringConfig {
        ScoringConfig {
            forest: ForestParams {
                n_estimators: 10,
                ..ForestParams::default()
            },
            boosting: BoostingParams {
                n_estimators: 15,
                ..BoostingParams::default()
            },
            cv_folds: 3,
            ..ScoringConfig::default()
        }
    }

    fn separable() -> TrainingDataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..60 {
            let label = u8::from(i % 3 == 0);
            let mut f = [0.0; FEATURE_COUNT];
            for (j, v) in f.iter_mut().enumerate() {
                *v = ((i * 7 + j * 3) % 11) as f64 / 10.0;
            }
            f[4] = if label == 1 { 2.0 + i as f64 / 100.0 } else { 0.5 + i as f64 / 100.0 };
            features.push(f);
            labels.push(label);
        }
        TrainingDataset::new(features, labels).unwrap()
    }

    #[test]
    fn test_fit_reports_both_splits() {
        let model = EnsembleModel::fit(&separable(), &quick_config()).unwrap();
        let r = model.report();
        assert_eq!(r.n_train + r.n_test, 60);
        assert_eq!(r.n_test, 12);
        assert!(r.metrics_train.auc.unwrap() > 0.99);
        assert!(r.auc_gap.is_some());
        assert_eq!(r.confusion_matrix_test.total(), r.n_test);
        assert!(r.standalone_test_auc.logistic.is_some());
    }

    #[test]
    fn test_score_is_probability_and_labelled_by_threshold() {
        let ds = separable();
        let model = EnsembleModel::fit(&ds, &quick_config()).unwrap();
        for f in ds.features().iter().take(10) {
            let s = model.score_features(f).unwrap();
            for p in [s.pd_stacking, s.pd_logistic, s.pd_random_forest, s.pd_gradient_boosting] {
                assert!((0.0..=1.0).contains(&p));
            }
            assert_eq!(s.predicted_label, predict_label(s.pd_stacking, 0.15));
        }
    }

    #[test]
    fn test_score_rejects_incomplete_row() {
        let ds = separable();
        let model = EnsembleModel::fit(&ds, &quick_config()).unwrap();
        let mut row = features_to_row(&ds.features()[0]);
        row.remove("X_9");
        assert!(matches!(
            model.score(&row),
            Err(CreditPdError::FeatureSchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_score_rejects_non_finite() {
        let ds = separable();
        let model = EnsembleModel::fit(&ds, &quick_config()).unwrap();
        let mut f = ds.features()[0];
        f[0] = f64::NAN;
        assert!(matches!(
            model.score_features(&f),
            Err(CreditPdError::NonFiniteFeature { .. })
        ));
    }

    #[test]
    fn test_overfitting_warning_above_limit_only() {
        let msg = overfitting_warning(Some(0.25), 0.10).unwrap();
        assert!(msg.contains("0.2500"), "{msg}");
        assert!(msg.contains("limit 0.10"), "{msg}");
        assert!(msg.contains("overfitting"));
        assert_eq!(overfitting_warning(Some(0.10), 0.10), None);
        assert_eq!(overfitting_warning(Some(-0.05), 0.0), None);
        assert_eq!(overfitting_warning(None, 0.0), None);
    }

    #[test]
    fn test_too_few_defaults_for_folds_rejected_before_fitting() {
        // 40 rows with two defaults: the split keeps one default for training.
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let mut f = [0.0; FEATURE_COUNT];
            for (j, v) in f.iter_mut().enumerate() {
                *v = ((i * 5 + j) % 9) as f64 / 10.0;
            }
            features.push(f);
            labels.push(u8::from(i == 10 || i == 30));
        }
        let ds = TrainingDataset::new(features, labels).unwrap();
        assert!(ds.require_stratifiable().is_ok());

        match EnsembleModel::fit(&ds, &ScoringConfig::default()) {
            Err(CreditPdError::InsufficientData(msg)) => {
                assert!(msg.contains("5-fold"), "{msg}");
                assert!(msg.contains("at least 5 defaults"), "{msg}");
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_fitting() {
        let config = ScoringConfig {
            test_fraction: 1.5,
            ..quick_config()
        };
        assert!(matches!(
            EnsembleModel::fit(&separable(), &config),
            Err(CreditPdError::InvalidInput { .. })
        ));
    }
}
