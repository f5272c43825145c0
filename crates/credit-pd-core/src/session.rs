//! Caller-owned scoring context.
//!
//! A [`ScoringSession`] holds the configuration and at most one fitted
//! [`EnsembleModel`]. Retraining replaces the model wholesale; there is no
//! process-wide model state.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::ScoringConfig;
use crate::ensemble::features::{FeatureRow, Features, PredictionRequest, FEATURE_COUNT};
use crate::ensemble::{EnsembleModel, ScoreOutput, TrainingDataset, TrainingReport};
use crate::error::CreditPdError;
use crate::ratios::{extract_ratios, RatioExtraction, RatioVector};
use crate::risk::decision::PredictedLabel;
use crate::risk::tier::{classify_pd, RiskTier, TierProfile};
use crate::statements::FinancialStatements;
use crate::types::{with_metadata, ComputationOutput, Precision};
use crate::CreditPdResult;

/// Outcome of running one borrower document through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAssessment {
    pub extraction: RatioExtraction,
    /// `None` when the ratio vector was incomplete.
    pub score: Option<ScoreOutput>,
    pub tier: TierProfile,
    pub predicted_label: Option<PredictedLabel>,
}

impl CreditAssessment {
    pub fn ratios(&self) -> &RatioVector {
        &self.extraction.ratios
    }

    pub fn pd(&self) -> Option<f64> {
        self.score.map(|s| s.pd_stacking)
    }
}

#[derive(Debug, Clone)]
pub struct ScoringSession {
    config: ScoringConfig,
    model: Option<EnsembleModel>,
}

impl ScoringSession {
    pub fn new(config: ScoringConfig) -> CreditPdResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&EnsembleModel> {
        self.model.as_ref()
    }

    /// Fit a new model, discarding any previous one first. On failure the
    /// session is left untrained.
    pub fn train(
        &mut self,
        dataset: &TrainingDataset,
    ) -> CreditPdResult<ComputationOutput<TrainingReport>> {
        let start = Instant::now();
        self.model = None;

        let model = EnsembleModel::fit(dataset, &self.config)?;
        let report = model.report().clone();
        self.model = Some(model);

        Ok(with_metadata(
            "Stacked ensemble: logistic regression, random forest and gradient-boosted trees \
             combined by a logistic meta-model on stratified out-of-fold probabilities",
            &self.config,
            report.warnings.clone(),
            start.elapsed().as_micros() as u64,
            Precision::Float,
            report,
        ))
    }

    fn fitted(&self) -> CreditPdResult<&EnsembleModel> {
        self.model.as_ref().ok_or(CreditPdError::ModelNotTrained)
    }

    pub fn predict(&self, row: &FeatureRow) -> CreditPdResult<ScoreOutput> {
        self.fitted()?.score(row)
    }

    pub fn predict_request(&self, request: &PredictionRequest) -> CreditPdResult<ScoreOutput> {
        self.fitted()?.score_request(request)
    }

    /// Extract, score and classify one borrower.
    ///
    /// An untrained session and structural workbook problems are errors. An
    /// incomplete ratio vector is not: the assessment comes back without
    /// scores, with an undetermined tier and a warning.
    pub fn assess(
        &self,
        statements: &FinancialStatements,
    ) -> CreditPdResult<ComputationOutput<CreditAssessment>> {
        let start = Instant::now();
        let model = self.fitted()?;
        let extraction = extract_ratios(statements)?;
        let mut warnings = extraction.warnings.clone();

        let (score, tier) = match complete_features(&extraction.result.ratios) {
            Some(features) => {
                let score = model.score_features(&features)?;
                (Some(score), classify_pd(Some(score.pd_stacking)))
            }
            None => {
                let codes: Vec<&str> = extraction
                    .result
                    .ratios
                    .missing()
                    .iter()
                    .map(|id| id.code())
                    .collect();
                tracing::warn!(missing = %codes.join(","), "PD not computed");
                warnings.push(format!(
                    "PD not computed: ratios {} are missing; risk tier undetermined.",
                    codes.join(", ")
                ));
                (None, RiskTier::Undetermined)
            }
        };

        let assessment = CreditAssessment {
            extraction: extraction.result,
            score,
            tier: tier.profile(),
            predicted_label: score.map(|s| s.predicted_label),
        };

        Ok(with_metadata(
            "Ratio extraction, stacked-ensemble PD and five-band risk tier",
            &serde_json::json!({
                "decision_threshold": model.decision_threshold(),
                "tier_bands": ["<2%", "2-5%", "5-10%", "10-20%", ">=20%"],
            }),
            warnings,
            start.elapsed().as_micros() as u64,
            Precision::Float,
            assessment,
        ))
    }
}

/// Model features for a complete ratio vector.
fn complete_features(ratios: &RatioVector) -> Option<Features> {
    let values = ratios.to_f64();
    let mut features = [0.0; FEATURE_COUNT];
    for (slot, value) in features.iter_mut().zip(values) {
        *slot = value?;
    }
    Some(features)
}
