use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use super::features::{check_finite, Features, FEATURE_COUNT, FEATURE_NAMES};
use crate::error::CreditPdError;
use crate::CreditPdResult;

/// Name of the binary target column in training files.
pub const LABEL_COLUMN: &str = "default";

/// Historical observations: fourteen ratios and a 0/1 default flag per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDataset {
    features: Vec<Features>,
    labels: Vec<u8>,
}

/// Class counts of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassBalance {
    pub defaults: usize,
    pub non_defaults: usize,
}

impl TrainingDataset {
    pub fn new(features: Vec<Features>, labels: Vec<u8>) -> CreditPdResult<Self> {
        if features.len() != labels.len() {
            return Err(CreditPdError::InvalidInput {
                field: "labels".into(),
                reason: format!(
                    "{} feature rows but {} labels",
                    features.len(),
                    labels.len()
                ),
            });
        }
        if let Some(pos) = labels.iter().position(|l| *l > 1) {
            return Err(CreditPdError::InvalidInput {
                field: format!("labels[{pos}]"),
                reason: "Labels must be 0 or 1.".into(),
            });
        }
        for row in &features {
            check_finite(row)?;
        }
        Ok(Self { features, labels })
    }

    /// Load a training file with a header row. Columns `X_1..X_14` and
    /// `default` are required; other columns are ignored.
    pub fn from_csv_reader<R: Read>(reader: R) -> CreditPdResult<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = FEATURE_NAMES
            .iter()
            .copied()
            .chain(std::iter::once(LABEL_COLUMN))
            .filter(|name| position(*name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(CreditPdError::MissingColumns {
                table: "training data".into(),
                columns: missing,
            });
        }
        let feature_idx: Vec<usize> = FEATURE_NAMES.iter().filter_map(|n| position(*n)).collect();
        let label_idx = position(LABEL_COLUMN).ok_or_else(|| CreditPdError::MissingColumns {
            table: "training data".into(),
            columns: vec![LABEL_COLUMN.into()],
        })?;

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (i, record) in rdr.records().enumerate() {
            let record = record?;
            // Header is line 1.
            let line = i + 2;
            let mut row = [0.0; FEATURE_COUNT];
            for (slot, (&col, name)) in row.iter_mut().zip(feature_idx.iter().zip(FEATURE_NAMES)) {
                *slot = parse_cell(record.get(col), line, name)?;
            }
            let label = parse_cell(record.get(label_idx), line, LABEL_COLUMN)?;
            labels.push(match label {
                l if l == 0.0 => 0,
                l if l == 1.0 => 1,
                other => {
                    return Err(CreditPdError::InvalidInput {
                        field: format!("row {line}, column {LABEL_COLUMN}"),
                        reason: format!("Label must be 0 or 1, found {other}"),
                    })
                }
            });
            features.push(row);
        }

        Self::new(features, labels)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> CreditPdResult<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            CreditPdError::IoError(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_csv_reader(file)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &[Features] {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn balance(&self) -> ClassBalance {
        let defaults = self.labels.iter().filter(|l| **l == 1).count();
        ClassBalance {
            defaults,
            non_defaults: self.labels.len() - defaults,
        }
    }

    pub fn default_rate(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.balance().defaults as f64 / self.len() as f64
    }

    /// Rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: indices.iter().map(|&i| self.features[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Both classes must be present at least twice to stratify.
    pub fn require_stratifiable(&self) -> CreditPdResult<()> {
        let b = self.balance();
        if b.defaults < 2 || b.non_defaults < 2 {
            return Err(CreditPdError::InsufficientData(format!(
                "need at least two defaults and two non-defaults, found {} and {}",
                b.defaults, b.non_defaults
            )));
        }
        Ok(())
    }

    /// Each of `folds` stratified folds must leave rows of both classes in
    /// its training part, so a training split needs at least `folds` of each.
    pub fn require_fold_coverage(&self, folds: usize) -> CreditPdResult<()> {
        let b = self.balance();
        if b.defaults < folds || b.non_defaults < folds {
            return Err(CreditPdError::InsufficientData(format!(
                "{folds}-fold stacking needs at least {folds} defaults and {folds} non-defaults \
                 in the training split, found {} and {}",
                b.defaults, b.non_defaults
            )));
        }
        Ok(())
    }
}

fn parse_cell(cell: Option<&str>, line: usize, column: &str) -> CreditPdResult<f64> {
    let text = cell.unwrap_or("");
    let value: f64 = text.parse().map_err(|_| CreditPdError::InvalidInput {
        field: format!("row {line}, column {column}"),
        reason: format!("'{text}' is not a number"),
    })?;
    if !value.is_finite() {
        return Err(CreditPdError::InvalidInput {
            field: format!("row {line}, column {column}"),
            reason: format!("'{text}' is not a finite number"),
        });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Stratified split
// ---------------------------------------------------------------------------

/// Split into `(train, test)` keeping the default rate of each side close to
/// the whole. Each class contributes `round(n_class * test_fraction)` rows to
/// the test side, clamped so both sides keep at least one row of each class.
pub fn stratified_split(
    dataset: &TrainingDataset,
    test_fraction: f64,
    seed: u64,
) -> CreditPdResult<(TrainingDataset, TrainingDataset)> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(CreditPdError::InvalidInput {
            field: "test_fraction".into(),
            reason: "Must be strictly between 0 and 1.".into(),
        });
    }
    dataset.require_stratifiable()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = dataset
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);
        let n = members.len();
        let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
        test_idx.extend_from_slice(&members[..n_test]);
        train_idx.extend_from_slice(&members[n_test..]);
    }

    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);
    Ok((dataset.subset(&train_idx), dataset.subset(&test_idx)))
}

/// Assign each row a fold in `0..folds`, dealing each class round-robin so
/// every fold sees the overall default rate.
pub fn stratified_folds(labels: &[u8], folds: usize) -> Vec<usize> {
    let mut assignment = vec![0; labels.len()];
    let mut next = [0usize; 2];
    for (slot, label) in assignment.iter_mut().zip(labels) {
        let class = usize::from(*label.min(&1));
        *slot = next[class] % folds;
        next[class] += 1;
    }
    assignment
}
