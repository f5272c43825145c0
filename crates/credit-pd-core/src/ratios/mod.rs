pub mod extractor;
pub mod vector;

pub use extractor::{compute_ratios, extract_ratios, RatioExtraction, SelectedPeriods};
pub use vector::{RatioId, RatioVector, RATIO_COUNT};
