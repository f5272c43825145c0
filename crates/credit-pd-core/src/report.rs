//! Input record for document exporters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commentary::{CommentaryOutcome, ProviderError, NOT_AVAILABLE};
use crate::risk::decision::PredictedLabel;
use crate::risk::tier::TierProfile;
use crate::session::CreditAssessment;
use crate::types::Ratio;

pub const DEFAULT_COMPANY_NAME: &str = "CORPORATE BORROWER";

/// One line of the ratio table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioLine {
    pub code: String,
    pub name: String,
    /// Four decimals, or `N/A`.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportInput {
    pub company_name: String,
    pub generated_at: DateTime<Utc>,
    pub ratios: Vec<RatioLine>,
    pub pd: Option<f64>,
    /// PD as a percentage with two decimals, or `N/A`.
    pub pd_display: String,
    pub predicted_label: Option<PredictedLabel>,
    pub tier: TierProfile,
    pub commentary: String,
}

impl ReportInput {
    pub fn new(
        company_name: Option<&str>,
        assessment: &CreditAssessment,
        commentary: &CommentaryOutcome,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let company_name = company_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_COMPANY_NAME)
            .to_string();
        let ratios = assessment
            .ratios()
            .iter()
            .map(|(id, value)| RatioLine {
                code: id.code().into(),
                name: id.display_name().into(),
                value: format_ratio(value),
            })
            .collect();
        let pd = assessment.pd();

        Self {
            company_name,
            generated_at,
            ratios,
            pd,
            pd_display: pd
                .map(|p| format!("{:.2}%", p * 100.0))
                .unwrap_or_else(|| NOT_AVAILABLE.into()),
            predicted_label: assessment.predicted_label,
            tier: assessment.tier.clone(),
            commentary: commentary.display_text(),
        }
    }
}

/// Ratio display value: four decimals, `N/A` when missing.
pub fn format_ratio(value: Ratio) -> String {
    match value {
        Some(v) => format!("{:.4}", v.round_dp(4)),
        None => NOT_AVAILABLE.into(),
    }
}

/// Anything that writes a report somewhere.
pub trait ReportExporter {
    fn export(&self, report: &ReportInput) -> Result<(), ProviderError>;
}

/// Run an exporter. A failure is logged and returned as a message; it never
/// propagates as an error.
pub fn export_report(exporter: &dyn ReportExporter, report: &ReportInput) -> Option<String> {
    match exporter.export(report) {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!(error = %e, "report export failed");
            Some(format!("Report export failed: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::ScoreOutput;
    use crate::ratios::{RatioExtraction, RatioId, RatioVector, RATIO_COUNT};
    use crate::risk::tier::{classify_pd, RiskTier};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn assessment(score: Option<ScoreOutput>) -> CreditAssessment {
        let mut values = [Some(dec!(1.23456)); RATIO_COUNT];
        values[RatioId::X6.index()] = None;
        CreditAssessment {
            extraction: RatioExtraction {
                ratios: RatioVector::new(values),
                figures: BTreeMap::new(),
                periods: Vec::new(),
            },
            score,
            tier: classify_pd(score.map(|s| s.pd_stacking)).profile(),
            predicted_label: score.map(|s| s.predicted_label),
        }
    }

    fn scored() -> ScoreOutput {
        ScoreOutput {
            pd_stacking: 0.15,
            pd_logistic: 0.2,
            pd_random_forest: 0.1,
            pd_gradient_boosting: 0.12,
            predicted_label: PredictedLabel::Default,
            decision_threshold: 0.15,
        }
    }

    struct Broken;

    impl ReportExporter for Broken {
        fn export(&self, _report: &ReportInput) -> Result<(), ProviderError> {
            Err("disk full".into())
        }
    }

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(Some(dec!(1.23456))), "1.2346");
        assert_eq!(format_ratio(Some(dec!(2))), "2.0000");
        assert_eq!(format_ratio(None), "N/A");
    }

    #[test]
    fn test_report_from_scored_assessment() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let r = ReportInput::new(
            Some("ACME JSC"),
            &assessment(Some(scored())),
            &CommentaryOutcome::Available("Lend with covenants.".into()),
            at,
        );
        assert_eq!(r.company_name, "ACME JSC");
        assert_eq!(r.ratios.len(), RATIO_COUNT);
        assert_eq!(r.ratios[0].value, "1.2346");
        assert_eq!(r.ratios[5].value, "N/A");
        assert_eq!(r.pd_display, "15.00%");
        assert_eq!(r.tier.tier, RiskTier::B);
        assert_eq!(r.predicted_label, Some(PredictedLabel::Default));
        assert_eq!(r.commentary, "Lend with covenants.");
    }

    #[test]
    fn test_report_without_score_uses_placeholders() {
        let r = ReportInput::new(
            None,
            &assessment(None),
            &CommentaryOutcome::Unavailable("no provider".into()),
            Utc::now(),
        );
        assert_eq!(r.company_name, DEFAULT_COMPANY_NAME);
        assert_eq!(r.pd_display, "N/A");
        assert_eq!(r.tier.rating, "N/A");
        assert!(r.commentary.contains("no provider"));
    }

    #[test]
    fn test_export_failure_is_reported_not_raised() {
        let r = ReportInput::new(None, &assessment(None), &CommentaryOutcome::Available("x".into()), Utc::now());
        let msg = export_report(&Broken, &r).unwrap();
        assert!(msg.contains("disk full"));
    }
}
