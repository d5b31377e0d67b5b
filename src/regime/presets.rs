// =============================================================================
// Regime Weight Presets
// =============================================================================
//
// Each regime carries two independent weight sets:
//
//   timeframe  1h / 4h / 12h / 24h / 7d blend for the protected MomentumCore
//   category   momentum_core / technical_resid / supply_demand_block /
//              catalyst_block weights applied to the orthogonal residuals
//
// The supply/demand block is split 55 / 45 into volume and quality
// sub-weights before it is applied.
//
//   regime          momentum  technical  supply/demand  catalyst
//   trending_bull     0.42      0.20         0.28         0.10
//   choppy            0.27      0.28         0.30         0.15
//   high_vol          0.32      0.23         0.33         0.12

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WeightError;
use crate::regime::Regime;

/// Maximum allowed drift of a category table from a unit sum.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Share of the supply/demand block given to the volume residual.
pub const VOLUME_SHARE: f64 = 0.55;

/// Share of the supply/demand block given to the quality residual.
pub const QUALITY_SHARE: f64 = 0.45;

pub const KEY_MOMENTUM: &str = "momentum_core";
pub const KEY_TECHNICAL: &str = "technical_resid";
pub const KEY_SUPPLY_DEMAND: &str = "supply_demand_block";
pub const KEY_CATALYST: &str = "catalyst_block";

/// The four required category keys, in scoring order.
pub const CATEGORY_KEYS: [&str; 4] = [KEY_MOMENTUM, KEY_TECHNICAL, KEY_SUPPLY_DEMAND, KEY_CATALYST];

// =============================================================================
// TimeframeWeights
// =============================================================================

/// Blend weights for the five momentum timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeframeWeights {
    #[serde(rename = "1h")]
    pub h1: f64,
    #[serde(rename = "4h")]
    pub h4: f64,
    #[serde(rename = "12h")]
    pub h12: f64,
    #[serde(rename = "24h")]
    pub h24: f64,
    #[serde(rename = "7d")]
    pub d7: f64,
}

impl TimeframeWeights {
    pub fn for_regime(regime: Regime) -> Self {
        match regime {
            // Bull: 24h 10-15%, 7d 5-10%
            Regime::TrendingBull => Self {
                h1: 0.20,
                h4: 0.35,
                h12: 0.30,
                h24: 0.12,
                d7: 0.08,
            },
            // Choppy: 24h 5-8%, 7d at most 2%
            Regime::Choppy => Self {
                h1: 0.15,
                h4: 0.30,
                h12: 0.40,
                h24: 0.07,
                d7: 0.02,
            },
            Regime::HighVol => Self {
                h1: 0.25,
                h4: 0.40,
                h12: 0.25,
                h24: 0.10,
                d7: 0.00,
            },
        }
    }

    /// Weighted blend of `[1h, 4h, 12h, 24h, 7d]` returns.
    pub fn blend(&self, returns: [f64; 5]) -> f64 {
        self.h1 * returns[0]
            + self.h4 * returns[1]
            + self.h12 * returns[2]
            + self.h24 * returns[3]
            + self.d7 * returns[4]
    }

    pub fn sum(&self) -> f64 {
        self.h1 + self.h4 + self.h12 + self.h24 + self.d7
    }

    /// Every weight must be finite and non-negative.  The blend is not
    /// required to sum to one.
    pub fn validate(&self, regime: &str) -> Result<(), WeightError> {
        let entries = [
            ("1h", self.h1),
            ("4h", self.h4),
            ("12h", self.h12),
            ("24h", self.h24),
            ("7d", self.d7),
        ];
        check_non_negative(regime, entries)
    }
}

fn check_non_negative<'a>(
    regime: &str,
    entries: impl IntoIterator<Item = (&'a str, f64)>,
) -> Result<(), WeightError> {
    for (key, value) in entries {
        if value < 0.0 || !value.is_finite() {
            return Err(WeightError::NegativeWeight {
                regime: regime.to_string(),
                key: key.to_string(),
                value,
            });
        }
    }
    Ok(())
}

// =============================================================================
// CategoryWeights
// =============================================================================

/// Validated category weight table for one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub momentum_core: f64,
    pub technical_resid: f64,
    pub supply_demand_block: f64,
    pub catalyst_block: f64,
}

impl CategoryWeights {
    pub fn for_regime(regime: Regime) -> Self {
        match regime {
            Regime::TrendingBull => Self {
                momentum_core: 0.42,
                technical_resid: 0.20,
                supply_demand_block: 0.28,
                catalyst_block: 0.10,
            },
            Regime::Choppy => Self {
                momentum_core: 0.27,
                technical_resid: 0.28,
                supply_demand_block: 0.30,
                catalyst_block: 0.15,
            },
            Regime::HighVol => Self {
                momentum_core: 0.32,
                technical_resid: 0.23,
                supply_demand_block: 0.33,
                catalyst_block: 0.12,
            },
        }
    }

    /// Build from a string-keyed map, rejecting missing keys, negative
    /// weights and a sum outside 1.0 ± `WEIGHT_SUM_TOLERANCE`.
    ///
    /// Extra keys are ignored.
    pub fn from_map(regime: &str, map: &BTreeMap<String, f64>) -> Result<Self, WeightError> {
        let mut values = [0.0; 4];
        for (slot, key) in values.iter_mut().zip(CATEGORY_KEYS) {
            *slot = *map.get(key).ok_or_else(|| WeightError::MissingKey {
                regime: regime.to_string(),
                key: key.to_string(),
            })?;
        }

        let weights = Self {
            momentum_core: values[0],
            technical_resid: values[1],
            supply_demand_block: values[2],
            catalyst_block: values[3],
        };
        weights.validate(regime)?;
        Ok(weights)
    }

    fn entries(&self) -> [(&'static str, f64); 4] {
        [
            (KEY_MOMENTUM, self.momentum_core),
            (KEY_TECHNICAL, self.technical_resid),
            (KEY_SUPPLY_DEMAND, self.supply_demand_block),
            (KEY_CATALYST, self.catalyst_block),
        ]
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    pub fn sum(&self) -> f64 {
        self.momentum_core + self.technical_resid + self.supply_demand_block + self.catalyst_block
    }

    /// Re-check non-negativity and the unit sum.
    pub fn validate(&self, regime: &str) -> Result<(), WeightError> {
        check_non_negative(regime, self.entries())?;
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightError::SumDrift {
                regime: regime.to_string(),
                sum,
                tolerance: WEIGHT_SUM_TOLERANCE,
            });
        }
        Ok(())
    }

    /// Volume sub-weight (55% of the supply/demand block).
    pub fn volume(&self) -> f64 {
        self.supply_demand_block * VOLUME_SHARE
    }

    /// Quality sub-weight (45% of the supply/demand block).
    pub fn quality(&self) -> f64 {
        self.supply_demand_block * QUALITY_SHARE
    }
}

// =============================================================================
// RegimePreset
// =============================================================================

/// Both weight sets for one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimePreset {
    pub timeframe: TimeframeWeights,
    pub category: CategoryWeights,
}

impl RegimePreset {
    pub fn builtin(regime: Regime) -> Self {
        Self {
            timeframe: TimeframeWeights::for_regime(regime),
            category: CategoryWeights::for_regime(regime),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn map(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn builtin_category_weights_sum_to_one() {
        for regime in Regime::ALL {
            let w = CategoryWeights::for_regime(regime);
            assert!((w.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE, "{regime}");
            assert!(w.validate(regime.as_str()).is_ok());
            assert!(w.momentum_core >= 0.27 && w.momentum_core <= 0.42);
            assert!(w.catalyst_block >= 0.10 && w.catalyst_block <= 0.15);
        }
    }

    #[test]
    fn builtin_timeframe_weights_are_valid() {
        for regime in Regime::ALL {
            let w = TimeframeWeights::for_regime(regime);
            assert!(w.validate(regime.as_str()).is_ok(), "{regime}");
        }
        // Blends are not normalised.
        assert!((TimeframeWeights::for_regime(Regime::Choppy).sum() - 0.94).abs() < 1e-10);
    }

    #[test]
    fn trending_bull_blend_matches_hand_computation() {
        let w = TimeframeWeights::for_regime(Regime::TrendingBull);
        let core = w.blend([2.0, 3.0, 4.0, 12.0, 6.0]);
        // 0.40 + 1.05 + 1.20 + 1.44 + 0.48
        assert!((core - 4.57).abs() < 1e-10);
    }

    #[test]
    fn timeframe_validate_rejects_nan_and_negative() {
        let mut w = TimeframeWeights::for_regime(Regime::HighVol);
        w.h12 = f64::NAN;
        assert!(matches!(
            w.validate("high_vol"),
            Err(WeightError::NegativeWeight { ref key, .. }) if key == "12h"
        ));
        w.h12 = -0.1;
        assert!(w.validate("high_vol").is_err());
    }

    #[test]
    fn validate_rejects_negative_weight_with_unit_sum() {
        let w = CategoryWeights {
            momentum_core: 1.3,
            technical_resid: -0.3,
            supply_demand_block: 0.0,
            catalyst_block: 0.0,
        };
        assert_eq!(
            w.validate("choppy").unwrap_err(),
            WeightError::NegativeWeight {
                regime: "choppy".into(),
                key: "technical_resid".into(),
                value: -0.3,
            }
        );
    }

    #[test]
    fn supply_demand_split() {
        let w = CategoryWeights::for_regime(Regime::TrendingBull);
        assert!((w.volume() - 0.28 * 0.55).abs() < 1e-12);
        assert!((w.quality() - 0.28 * 0.45).abs() < 1e-12);
        assert!((w.volume() + w.quality() - w.supply_demand_block).abs() < 1e-12);
    }

    #[test]
    fn from_map_rejects_missing_key() {
        let m = map(&[
            ("momentum_core", 0.5),
            ("technical_resid", 0.2),
            ("supply_demand_block", 0.3),
        ]);
        let err = CategoryWeights::from_map("custom", &m).unwrap_err();
        assert_eq!(
            err,
            WeightError::MissingKey {
                regime: "custom".into(),
                key: "catalyst_block".into()
            }
        );
    }

    #[test]
    fn from_map_rejects_negative_weight() {
        let m = map(&[
            ("momentum_core", 0.6),
            ("technical_resid", -0.1),
            ("supply_demand_block", 0.3),
            ("catalyst_block", 0.2),
        ]);
        assert!(matches!(
            CategoryWeights::from_map("custom", &m),
            Err(WeightError::NegativeWeight { .. })
        ));
    }

    #[test]
    fn from_map_rejects_sum_drift() {
        let m = map(&[
            ("momentum_core", 0.5),
            ("technical_resid", 0.3),
            ("supply_demand_block", 0.3),
            ("catalyst_block", 0.1),
        ]);
        let err = CategoryWeights::from_map("custom", &m).unwrap_err();
        assert!(err.to_string().contains("1.2000"));
    }

    #[test]
    fn from_map_accepts_small_drift_and_roundtrips() {
        let m = map(&[
            ("momentum_core", 0.42),
            ("technical_resid", 0.20),
            ("supply_demand_block", 0.28),
            ("catalyst_block", 0.105),
        ]);
        let w = CategoryWeights::from_map("custom", &m).unwrap();
        assert_eq!(w.to_map(), m);
    }
}
