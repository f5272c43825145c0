use thiserror::Error;

#[derive(Debug, Error)]
pub enum CreditPdError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing required sheet: {0}")]
    MissingSheet(String),

    #[error("Missing required columns in {table}: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model not trained: fit the ensemble on a training dataset before scoring")]
    ModelNotTrained,

    #[error("Feature schema mismatch: missing {}", .missing.join(", "))]
    FeatureSchemaMismatch { missing: Vec<String> },

    #[error("Non-finite value for feature {feature}")]
    NonFiniteFeature { feature: String },

    #[error("Numerical failure in {context}: {reason}")]
    NumericalFailure { context: String, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for CreditPdError {
    fn from(e: serde_json::Error) -> Self {
        CreditPdError::SerializationError(e.to_string())
    }
}

impl From<csv::Error> for CreditPdError {
    fn from(e: csv::Error) -> Self {
        CreditPdError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for CreditPdError {
    fn from(e: toml::de::Error) -> Self {
        CreditPdError::ConfigError(e.to_string())
    }
}

impl From<std::io::Error> for CreditPdError {
    fn from(e: std::io::Error) -> Self {
        CreditPdError::IoError(e.to_string())
    }
}

impl CreditPdError {
    /// True for errors caused by the caller's request rather than by the
    /// system (bad shape, missing fields, untrained model).
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CreditPdError::NumericalFailure { .. } | CreditPdError::IoError(_)
        )
    }
}
