use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Statement amounts as reported. Decimal to keep thousands-separated figures exact.
pub type Money = Decimal;

/// Financial ratio. `None` means the ratio could not be computed.
pub type Ratio = Option<Decimal>;

/// Probability in [0, 1].
pub type Probability = f64;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Numeric representation a computation ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Decimal,
    Float,
}

impl Precision {
    fn tag(self) -> &'static str {
        match self {
            Precision::Decimal => "rust_decimal_128bit",
            Precision::Float => "ieee754_f64",
        }
    }
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: Precision,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.tag().to_string(),
        },
    }
}
