use napi::Result as NapiResult;
use napi_derive::napi;

use credit_pd_core::ensemble::{PredictionRequest, TrainingDataset};
use credit_pd_core::ratios::extract_ratios;
use credit_pd_core::risk::classify;
use credit_pd_core::session::ScoringSession;
use credit_pd_core::statements::FinancialStatements;
use credit_pd_core::{CreditPdError, ScoringConfig};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Caller mistakes surface as `InvalidArg`, everything else as `GenericFailure`.
fn core_error(e: CreditPdError) -> napi::Error {
    napi::Error::new(error_status(&e), e.to_string())
}

fn error_status(e: &CreditPdError) -> napi::Status {
    if e.is_client_error() {
        napi::Status::InvalidArg
    } else {
        napi::Status::GenericFailure
    }
}

// ---------------------------------------------------------------------------
// Stateless helpers
// ---------------------------------------------------------------------------

/// Workbook JSON (object keyed by sheet name) to the X1-X14 extraction envelope.
#[napi]
pub fn extract_ratios_json(workbook_json: String) -> NapiResult<String> {
    let statements = FinancialStatements::from_workbook_str(&workbook_json).map_err(core_error)?;
    let output = extract_ratios(&statements).map_err(core_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Risk tier and label for a PD. The threshold is the default configuration
/// with `CPD_*` environment overrides; a non-finite PD gets no label.
#[napi]
pub fn classify_pd_json(pd: f64) -> NapiResult<String> {
    let config = ScoringConfig::from_env();
    config.validate().map_err(core_error)?;
    let output = classify(pd, &config).map_err(core_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scoring session
// ---------------------------------------------------------------------------

#[napi(js_name = "ScoringSession")]
pub struct JsScoringSession {
    inner: ScoringSession,
}

#[napi]
impl JsScoringSession {
    /// Optional TOML configuration; defaults otherwise.
    #[napi(constructor)]
    pub fn new(config_toml: Option<String>) -> napi::Result<Self> {
        let config = match config_toml {
            Some(toml) => ScoringConfig::from_toml_str(&toml).map_err(core_error)?,
            None => ScoringConfig::default(),
        };
        let inner = ScoringSession::new(config).map_err(core_error)?;
        Ok(Self { inner })
    }

    #[napi(getter)]
    pub fn is_trained(&self) -> bool {
        self.inner.is_trained()
    }

    /// Fit on CSV text with columns X_1..X_14 and default. Returns the training report.
    #[napi]
    pub fn train(&mut self, training_csv: String) -> NapiResult<String> {
        let dataset =
            TrainingDataset::from_csv_reader(training_csv.as_bytes()).map_err(core_error)?;
        let output = self.inner.train(&dataset).map_err(core_error)?;
        serde_json::to_string(&output).map_err(to_napi_error)
    }

    #[napi]
    pub fn predict(&self, request_json: String) -> NapiResult<String> {
        let request: PredictionRequest =
            serde_json::from_str(&request_json).map_err(to_napi_error)?;
        let output = self.inner.predict_request(&request).map_err(core_error)?;
        serde_json::to_string(&output).map_err(to_napi_error)
    }

    /// Tier and label for a PD under this session's decision threshold.
    #[napi]
    pub fn classify(&self, pd: f64) -> NapiResult<String> {
        let output = classify(pd, self.inner.config()).map_err(core_error)?;
        serde_json::to_string(&output).map_err(to_napi_error)
    }

    #[napi]
    pub fn assess(&self, workbook_json: String) -> NapiResult<String> {
        let statements =
            FinancialStatements::from_workbook_str(&workbook_json).map_err(core_error)?;
        let output = self.inner.assess(&statements).map_err(core_error)?;
        serde_json::to_string(&output).map_err(to_napi_error)
    }
}

