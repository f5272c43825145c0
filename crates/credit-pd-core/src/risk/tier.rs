//! Five-band risk tiers over PD.
//!
//! Bands are evaluated low-to-high and the first upper bound the PD falls
//! under wins, so each band is half-open: `[lower, upper)`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// PD missing: no rating can be given.
    Undetermined,
    #[serde(rename = "AAA-AA")]
    AaaAa,
    #[serde(rename = "A-BBB")]
    ABbb,
    #[serde(rename = "BB")]
    Bb,
    B,
    #[serde(rename = "CCC-D")]
    CccD,
}

/// Display record for a tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierProfile {
    pub tier: RiskTier,
    pub range: String,
    pub classification: String,
    pub rating: String,
    pub meaning: String,
    /// Hex display colour.
    pub color: String,
}

struct Band {
    upper: f64,
    tier: RiskTier,
}

/// Ordered bands; the last one is unbounded above.
const BANDS: [Band; 5] = [
    Band { upper: 0.02, tier: RiskTier::AaaAa },
    Band { upper: 0.05, tier: RiskTier::ABbb },
    Band { upper: 0.10, tier: RiskTier::Bb },
    Band { upper: 0.20, tier: RiskTier::B },
    Band { upper: f64::INFINITY, tier: RiskTier::CccD },
];

impl RiskTier {
    pub const RATED: [RiskTier; 5] = [
        RiskTier::AaaAa,
        RiskTier::ABbb,
        RiskTier::Bb,
        RiskTier::B,
        RiskTier::CccD,
    ];

    pub fn rating(self) -> &'static str {
        match self {
            Self::Undetermined => "N/A",
            Self::AaaAa => "AAA-AA",
            Self::ABbb => "A-BBB",
            Self::Bb => "BB",
            Self::B => "B",
            Self::CccD => "CCC-D",
        }
    }

    pub fn range(self) -> &'static str {
        match self {
            Self::Undetermined => "N/A",
            Self::AaaAa => "< 2%",
            Self::ABbb => "2-5%",
            Self::Bb => "5-10%",
            Self::B => "10-20%",
            Self::CccD => ">= 20%",
        }
    }

    pub fn classification(self) -> &'static str {
        match self {
            Self::Undetermined => "Undetermined",
            Self::AaaAa => "Very low",
            Self::ABbb => "Low",
            Self::Bb => "Medium",
            Self::B => "High",
            Self::CccD => "Very high",
        }
    }

    pub fn meaning(self) -> &'static str {
        match self {
            Self::Undetermined => "Insufficient data",
            Self::AaaAa => "Excellent borrower",
            Self::ABbb => "Good borrower",
            Self::Bb => "Requires monitoring",
            Self::B => "Significant risk",
            Self::CccD => "High default risk",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Undetermined => "#6c757d",
            Self::AaaAa => "#28a745",
            Self::ABbb => "#5cb85c",
            Self::Bb => "#ffc107",
            Self::B => "#fd7e14",
            Self::CccD => "#dc3545",
        }
    }

    pub fn profile(self) -> TierProfile {
        TierProfile {
            tier: self,
            range: self.range().into(),
            classification: self.classification().into(),
            rating: self.rating().into(),
            meaning: self.meaning().into(),
            color: self.color().into(),
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rating())
    }
}

/// Map a PD to its tier. `None` and NaN map to [`RiskTier::Undetermined`].
pub fn classify_pd(pd: Option<f64>) -> RiskTier {
    let pd = match pd {
        Some(p) if !p.is_nan() => p,
        _ => return RiskTier::Undetermined,
    };
    for band in &BANDS {
        if pd < band.upper {
            return band.tier;
        }
    }
    RiskTier::CccD
}
