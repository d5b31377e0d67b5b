// =============================================================================
// Normalizer: regime weights × orthogonal residuals → bounded contributions
// =============================================================================
//
// Each residual vector is collapsed to a scalar:
//
//   momentum   the scaled MomentumCore component
//   technical  mean of its three slots
//   volume     0.7 · surge slot + 0.3 · ΔOI slot
//   quality    mean of its four slots
//   catalyst   mean of its three components (it sits on its own axes)
//
// and weighted into points:
//
//   contribution = clamp(weight × scalar × 100, 0, 60)
//
// The 60-point rail keeps any single category from dominating.  The sum of
// contributions (pre-social total) must land in [-20, 120].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NormalizationError;
use crate::factors::{FactorVector, OrthogonalizedFactors};
use crate::regime::CategoryWeights;

pub const CONTRIBUTION_CAP: f64 = 60.0;
pub const TOTAL_MIN: f64 = -20.0;
pub const TOTAL_MAX: f64 = 120.0;

const POINTS_SCALE: f64 = 100.0;
const SURGE_SHARE: f64 = 0.7;
const DELTA_OI_SHARE: f64 = 0.3;
const TECHNICAL_SLOTS: usize = 3;
const CATALYST_SLOTS: usize = 3;

// =============================================================================
// Residual breakdowns
// =============================================================================

/// Volume residual split into its components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeComponents {
    /// Volume surge residual.
    pub volume: f64,
    /// Open interest change residual.
    pub delta_oi: f64,
    /// 70 / 30 weighted combination.
    pub combined: f64,
}

/// Quality residual split into its components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityComponents {
    pub oi_resid: f64,
    pub reserves: f64,
    pub etf_tint: f64,
    pub venue_health: f64,
    /// Equal-weighted combination.
    pub combined: f64,
}

/// Scalar view of every orthogonalized factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualScalars {
    pub momentum: f64,
    pub technical: f64,
    pub volume: VolumeComponents,
    pub quality: QualityComponents,
    pub catalyst: f64,
}

fn slot(f: &FactorVector, i: usize) -> f64 {
    f.values.get(i).copied().unwrap_or(0.0)
}

fn mean_of(f: &FactorVector, n: usize) -> f64 {
    let n = n.min(f.len());
    if n == 0 {
        return 0.0;
    }
    f.values[..n].iter().sum::<f64>() / n as f64
}

impl ResidualScalars {
    pub fn from_factors(factors: &OrthogonalizedFactors) -> Self {
        let v = &factors.volume;
        let q = &factors.quality;

        let volume = VolumeComponents {
            volume: slot(v, 0),
            delta_oi: slot(v, 1),
            combined: SURGE_SHARE * slot(v, 0) + DELTA_OI_SHARE * slot(v, 1),
        };
        let quality = QualityComponents {
            oi_resid: slot(q, 0),
            reserves: slot(q, 1),
            etf_tint: slot(q, 2),
            venue_health: slot(q, 3),
            combined: mean_of(q, 4),
        };

        Self {
            momentum: slot(&factors.momentum, 0),
            technical: mean_of(&factors.technical, TECHNICAL_SLOTS),
            volume,
            quality,
            catalyst: factors
                .catalyst
                .as_ref()
                .map(|c| c.values.iter().sum::<f64>() / CATALYST_SLOTS as f64)
                .unwrap_or(0.0),
        }
    }
}

// =============================================================================
// Contributions
// =============================================================================

/// Per-category points, each in [0, 60].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryContributions {
    pub momentum_core: f64,
    pub technical_resid: f64,
    pub volume_resid: f64,
    pub quality_resid: f64,
    pub catalyst_resid: f64,
}

impl CategoryContributions {
    /// Pre-social total.
    pub fn total(&self) -> f64 {
        self.momentum_core
            + self.technical_resid
            + self.volume_resid
            + self.quality_resid
            + self.catalyst_resid
    }
}

/// Normalizer output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    pub residuals: ResidualScalars,
    pub contributions: CategoryContributions,
    pub total: f64,
}

// =============================================================================
// Normalizer
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    fn contribution(weight: f64, scalar: f64) -> f64 {
        let points = weight * scalar * POINTS_SCALE;
        if points.is_nan() {
            return 0.0;
        }
        points.clamp(0.0, CONTRIBUTION_CAP)
    }

    /// Weight the residuals of `factors` with `weights`.
    pub fn normalize(
        &self,
        factors: &OrthogonalizedFactors,
        weights: &CategoryWeights,
    ) -> Result<Normalized, NormalizationError> {
        let residuals = ResidualScalars::from_factors(factors);

        let contributions = CategoryContributions {
            momentum_core: Self::contribution(weights.momentum_core, residuals.momentum),
            technical_resid: Self::contribution(weights.technical_resid, residuals.technical),
            volume_resid: Self::contribution(weights.volume(), residuals.volume.combined),
            quality_resid: Self::contribution(weights.quality(), residuals.quality.combined),
            catalyst_resid: Self::contribution(weights.catalyst_block, residuals.catalyst),
        };

        let total = contributions.total();
        if !(TOTAL_MIN..=TOTAL_MAX).contains(&total) {
            return Err(NormalizationError::TotalOutOfRange {
                total,
                min: TOTAL_MIN,
                max: TOTAL_MAX,
            });
        }

        debug!(
            momentum = format!("{:.2}", contributions.momentum_core),
            technical = format!("{:.2}", contributions.technical_resid),
            volume = format!("{:.2}", contributions.volume_resid),
            quality = format!("{:.2}", contributions.quality_resid),
            catalyst = format!("{:.2}", contributions.catalyst_resid),
            total = format!("{:.2}", total),
            "residuals normalized"
        );

        Ok(Normalized {
            residuals,
            contributions,
            total,
        })
    }
}
