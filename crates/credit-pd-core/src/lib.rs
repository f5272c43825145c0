pub mod config;
pub mod error;
pub mod risk;
pub mod types;

#[cfg(feature = "ratios")]
pub mod statements;

#[cfg(feature = "ratios")]
pub mod ratios;

#[cfg(feature = "ensemble")]
pub mod ensemble;

#[cfg(all(feature = "ratios", feature = "ensemble"))]
pub mod session;

#[cfg(all(feature = "ratios", feature = "ensemble"))]
pub mod commentary;

#[cfg(all(feature = "ratios", feature = "ensemble"))]
pub mod report;

pub use config::ScoringConfig;
pub use error::CreditPdError;
pub use types::*;

pub type CreditPdResult<T> = Result<T, CreditPdError>;
