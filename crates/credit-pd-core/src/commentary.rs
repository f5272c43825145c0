//! Narrative commentary from an external analyst service.
//!
//! The pipeline hands the provider a flat key/value view of the assessment.
//! Whatever the provider does, its failure never fails the assessment: it is
//! folded into [`CommentaryOutcome::Unavailable`].

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::ensemble::ScoreOutput;
use crate::ratios::RatioVector;
use crate::report::format_ratio;

pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// A payload value: a number, or a label such as `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Number(f64),
    Text(String),
}

/// Ordered flat map handed to a commentary provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisPayload {
    entries: Vec<(String, PayloadValue)>,
}

pub const NOT_AVAILABLE: &str = "N/A";

impl AnalysisPayload {
    /// Ratios by display name, then the four PDs and the predicted label.
    pub fn new(ratios: &RatioVector, score: Option<&ScoreOutput>) -> Self {
        let mut payload = AnalysisPayload::default();
        for ((id, _), value) in ratios.iter().zip(ratios.to_f64()) {
            payload.push(id.display_name(), value);
        }
        payload.push("PD (stacking)", score.map(|s| s.pd_stacking));
        payload.push("PD (logistic)", score.map(|s| s.pd_logistic));
        payload.push("PD (random forest)", score.map(|s| s.pd_random_forest));
        payload.push("PD (gradient boosting)", score.map(|s| s.pd_gradient_boosting));
        payload.entries.push((
            "Predicted label".into(),
            PayloadValue::Text(
                score
                    .map(|s| s.predicted_label.to_string())
                    .unwrap_or_else(|| NOT_AVAILABLE.into()),
            ),
        ));
        payload
    }

    fn push(&mut self, key: &str, value: Option<f64>) {
        let value = match value {
            Some(v) if v.is_finite() => PayloadValue::Number(v),
            _ => PayloadValue::Text(NOT_AVAILABLE.into()),
        };
        self.entries.push((key.to_string(), value));
    }

    pub fn entries(&self) -> &[(String, PayloadValue)] {
        &self.entries
    }

    pub fn get(&self, key: &str) -> Option<&PayloadValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One `key: value` line per entry, ratios at four decimals.
    pub fn to_prompt_text(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| match v {
                PayloadValue::Number(n) => format!("{k}: {}", format_ratio_f64(*n)),
                PayloadValue::Text(t) => format!("{k}: {t}"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn format_ratio_f64(v: f64) -> String {
    match rust_decimal::Decimal::try_from(v) {
        Ok(d) => format_ratio(Some(d)),
        Err(_) => format!("{v:.4}"),
    }
}

impl Serialize for AnalysisPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Anything that can turn an assessment payload into prose.
pub trait CommentaryProvider {
    fn analyse(&self, payload: &AnalysisPayload) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum CommentaryOutcome {
    Available(String),
    /// Provider failed; carries the reason.
    Unavailable(String),
}

impl CommentaryOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, CommentaryOutcome::Available(_))
    }

    /// Text to show in a report.
    pub fn display_text(&self) -> String {
        match self {
            CommentaryOutcome::Available(text) => text.clone(),
            CommentaryOutcome::Unavailable(reason) => {
                format!("Commentary unavailable: {reason}")
            }
        }
    }
}

/// Ask `provider` for commentary. Errors and empty responses become
/// [`CommentaryOutcome::Unavailable`].
pub fn request_commentary(
    provider: &dyn CommentaryProvider,
    payload: &AnalysisPayload,
) -> CommentaryOutcome {
    match provider.analyse(payload) {
        Ok(text) if !text.trim().is_empty() => CommentaryOutcome::Available(text),
        Ok(_) => {
            tracing::warn!("commentary provider returned an empty response");
            CommentaryOutcome::Unavailable("empty response".into())
        }
        Err(e) => {
            tracing::warn!(error = %e, "commentary provider failed");
            CommentaryOutcome::Unavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratios::{RatioId, RATIO_COUNT};
    use crate::risk::decision::PredictedLabel;
    use rust_decimal_macros::dec;

    struct Fixed(&'static str);

    impl CommentaryProvider for Fixed {
        fn analyse(&self, _payload: &AnalysisPayload) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl CommentaryProvider for Failing {
        fn analyse(&self, _payload: &AnalysisPayload) -> Result<String, ProviderError> {
            Err("quota exceeded".into())
        }
    }

    fn score() -> ScoreOutput {
        ScoreOutput {
            pd_stacking: 0.12,
            pd_logistic: 0.2,
            pd_random_forest: 0.1,
            pd_gradient_boosting: 0.08,
            predicted_label: PredictedLabel::NonDefault,
            decision_threshold: 0.15,
        }
    }

    fn ratios() -> RatioVector {
        let mut values = [Some(dec!(0.5)); RATIO_COUNT];
        values[RatioId::X5.index()] = None;
        RatioVector::new(values)
    }

    #[test]
    fn test_payload_order_and_missing_values() {
        let p = AnalysisPayload::new(&ratios(), Some(&score()));
        assert_eq!(p.entries().len(), RATIO_COUNT + 5);
        assert_eq!(p.entries()[0].0, RatioId::X1.display_name());
        assert_eq!(
            p.get(RatioId::X5.display_name()),
            Some(&PayloadValue::Text("N/A".into()))
        );
        assert_eq!(p.get("PD (stacking)"), Some(&PayloadValue::Number(0.12)));
        assert_eq!(
            p.get("Predicted label"),
            Some(&PayloadValue::Text("Non-Default".into()))
        );
    }

    #[test]
    fn test_payload_without_score() {
        let p = AnalysisPayload::new(&ratios(), None);
        assert_eq!(p.get("PD (logistic)"), Some(&PayloadValue::Text("N/A".into())));
        assert_eq!(p.get("Predicted label"), Some(&PayloadValue::Text("N/A".into())));
    }

    #[test]
    fn test_payload_json_keeps_insertion_order() {
        let json = AnalysisPayload::new(&ratios(), Some(&score())).to_json().unwrap();
        let x1 = json.find("(X1)").unwrap();
        let x14 = json.find("(X14)").unwrap();
        let pd = json.find("PD (stacking)").unwrap();
        assert!(x1 < x14 && x14 < pd);
    }

    #[test]
    fn test_prompt_text_formats_four_decimals() {
        let text = AnalysisPayload::new(&ratios(), Some(&score())).to_prompt_text();
        assert!(text.contains("Gross margin (X1): 0.5000"));
        assert!(text.contains("Debt to assets (X5): N/A"));
    }

    #[test]
    fn test_provider_failure_is_isolated() {
        let p = AnalysisPayload::new(&ratios(), None);
        let outcome = request_commentary(&Failing, &p);
        assert_eq!(outcome, CommentaryOutcome::Unavailable("quota exceeded".into()));
        assert!(outcome.display_text().contains("quota exceeded"));
    }

    #[test]
    fn test_provider_success_and_empty() {
        let p = AnalysisPayload::new(&ratios(), None);
        assert!(request_commentary(&Fixed("Solid borrower."), &p).is_available());
        assert!(!request_commentary(&Fixed("   "), &p).is_available());
    }
}
