use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Ratio;

/// Number of ratios in the scoring vector.
pub const RATIO_COUNT: usize = 14;

// ---------------------------------------------------------------------------
// Ratio identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RatioId {
    X1,
    X2,
    X3,
    X4,
    X5,
    X6,
    X7,
    X8,
    X9,
    X10,
    X11,
    X12,
    X13,
    X14,
}

impl RatioId {
    pub const ALL: [RatioId; RATIO_COUNT] = [
        RatioId::X1,
        RatioId::X2,
        RatioId::X3,
        RatioId::X4,
        RatioId::X5,
        RatioId::X6,
        RatioId::X7,
        RatioId::X8,
        RatioId::X9,
        RatioId::X10,
        RatioId::X11,
        RatioId::X12,
        RatioId::X13,
        RatioId::X14,
    ];

    /// Zero-based position in the vector.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short code, e.g. `X7`.
    pub fn code(self) -> &'static str {
        const CODES: [&str; RATIO_COUNT] = [
            "X1", "X2", "X3", "X4", "X5", "X6", "X7", "X8", "X9", "X10", "X11", "X12", "X13",
            "X14",
        ];
        CODES[self.index()]
    }

    /// Column name used by training files and prediction requests, e.g. `X_7`.
    pub fn feature_name(self) -> &'static str {
        const NAMES: [&str; RATIO_COUNT] = [
            "X_1", "X_2", "X_3", "X_4", "X_5", "X_6", "X_7", "X_8", "X_9", "X_10", "X_11",
            "X_12", "X_13", "X_14",
        ];
        NAMES[self.index()]
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::X1 => "Gross margin (X1)",
            Self::X2 => "Pre-tax margin (X2)",
            Self::X3 => "Pre-tax ROA (X3)",
            Self::X4 => "Pre-tax ROE (X4)",
            Self::X5 => "Debt to assets (X5)",
            Self::X6 => "Debt to equity (X6)",
            Self::X7 => "Current ratio (X7)",
            Self::X8 => "Quick ratio (X8)",
            Self::X9 => "Interest coverage (X9)",
            Self::X10 => "Debt service coverage (X10)",
            Self::X11 => "Cash to equity (X11)",
            Self::X12 => "Inventory turnover (X12)",
            Self::X13 => "Days sales outstanding (X13)",
            Self::X14 => "Asset turnover (X14)",
        }
    }

    pub fn from_code(code: &str) -> Option<RatioId> {
        Self::ALL
            .into_iter()
            .find(|id| id.code() == code || id.feature_name() == code)
    }
}

impl std::fmt::Display for RatioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// RatioVector
// ---------------------------------------------------------------------------

/// The fourteen scoring ratios of one borrower. Immutable once built; a
/// missing entry is a ratio that could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RatioVector {
    values: [Ratio; RATIO_COUNT],
}

impl RatioVector {
    pub fn new(values: [Ratio; RATIO_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, id: RatioId) -> Ratio {
        self.values[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (RatioId, Ratio)> + '_ {
        RatioId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn missing(&self) -> Vec<RatioId> {
        self.iter()
            .filter(|(_, v)| v.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// Ratios as floats for scoring. A value too large for `f64` becomes
    /// missing.
    pub fn to_f64(&self) -> [Option<f64>; RATIO_COUNT] {
        let mut out = [None; RATIO_COUNT];
        for (slot, value) in out.iter_mut().zip(self.values.iter()) {
            *slot = value.and_then(|d| d.to_f64()).filter(|v| v.is_finite());
        }
        out
    }
}

impl Serialize for RatioVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RATIO_COUNT))?;
        for (id, value) in self.iter() {
            map.serialize_entry(id.code(), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RatioVector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: BTreeMap<String, Option<Decimal>> = BTreeMap::deserialize(deserializer)?;
        let mut values = [None; RATIO_COUNT];
        for (key, value) in raw {
            let id = RatioId::from_code(&key)
                .ok_or_else(|| D::Error::custom(format!("unknown ratio '{key}'")))?;
            values[id.index()] = value;
        }
        Ok(Self { values })
    }
}
