// =============================================================================
// Measurements Boost
// =============================================================================
//
// Three independent cross-venue measurements can nudge a finished score:
//
//   1. Funding divergence  |z| ≥ 2.5 → +2.0, ≥ 2.0 → +1.0 (only with divergence)
//   2. OI residual         |r| ≥ $2M → +1.5, ≥ $1M → +0.5
//   3. ETF flow tint       |t| ≥ 1.5% → +1.0, ≥ 1.0% → +0.5
//
// The sum is hard-capped (default +4.0) and added to both the internal and
// the social-inclusive score, which are then clamped to [0, 100] and
// [0, 114].  A source that does not answer contributes nothing and lowers
// the data-quality tier.
//
// Fetching is the caller's business: `MeasurementSource` is a plain
// synchronous trait, and `StaticMeasurements` carries pre-fetched snapshots.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BoundsViolation, MeasurementError};
use crate::scoring::composite::{CompositeScore, INTERNAL_MAX};
use crate::types::DataQuality;

/// Upper bound of the social-inclusive score once a boost is applied.
pub const BOOSTED_FINAL_MAX: f64 = 114.0;

pub const DEFAULT_BOOST_CAP: f64 = 4.0;

// =============================================================================
// Snapshots
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingSnapshot {
    /// Cross-venue funding z-score.
    pub funding_z: f64,
    pub divergence_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenInterestSnapshot {
    /// OI change not explained by price, USD.
    pub oi_residual: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EtfFlowSnapshot {
    /// Net ETF flow as a fraction of average daily volume.
    pub flow_tint: f64,
}

/// Source of the three external measurements.
pub trait MeasurementSource: Send + Sync {
    fn funding(&self, symbol: &str) -> Result<FundingSnapshot, MeasurementError>;
    fn open_interest(&self, symbol: &str) -> Result<OpenInterestSnapshot, MeasurementError>;
    fn etf_flows(&self, symbol: &str) -> Result<EtfFlowSnapshot, MeasurementError>;
}

/// Pre-fetched snapshots; a missing entry reads as unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticMeasurements {
    #[serde(default)]
    pub funding: Option<FundingSnapshot>,
    #[serde(default)]
    pub open_interest: Option<OpenInterestSnapshot>,
    #[serde(default)]
    pub etf_flows: Option<EtfFlowSnapshot>,
}

fn unavailable(source_name: &str, symbol: &str) -> MeasurementError {
    MeasurementError::Unavailable {
        source_name: source_name.to_string(),
        symbol: symbol.to_string(),
        reason: "no snapshot".to_string(),
    }
}

impl MeasurementSource for StaticMeasurements {
    fn funding(&self, symbol: &str) -> Result<FundingSnapshot, MeasurementError> {
        self.funding.ok_or_else(|| unavailable("funding", symbol))
    }

    fn open_interest(&self, symbol: &str) -> Result<OpenInterestSnapshot, MeasurementError> {
        self.open_interest
            .ok_or_else(|| unavailable("open_interest", symbol))
    }

    fn etf_flows(&self, symbol: &str) -> Result<EtfFlowSnapshot, MeasurementError> {
        self.etf_flows.ok_or_else(|| unavailable("etf_flows", symbol))
    }
}

// =============================================================================
// Tiers & insights
// =============================================================================

pub fn funding_boost(s: &FundingSnapshot) -> f64 {
    if !s.divergence_present {
        return 0.0;
    }
    match s.funding_z.abs() {
        z if z >= 2.5 => 2.0,
        z if z >= 2.0 => 1.0,
        _ => 0.0,
    }
}

pub fn oi_boost(s: &OpenInterestSnapshot) -> f64 {
    match s.oi_residual.abs() {
        r if r >= 2_000_000.0 => 1.5,
        r if r >= 1_000_000.0 => 0.5,
        _ => 0.0,
    }
}

pub fn etf_boost(s: &EtfFlowSnapshot) -> f64 {
    match s.flow_tint.abs() {
        t if t >= 0.015 => 1.0,
        t if t >= 0.01 => 0.5,
        _ => 0.0,
    }
}

pub fn funding_insight(s: &FundingSnapshot) -> String {
    if !s.divergence_present {
        return "Funding rates normal".to_string();
    }
    let z = s.funding_z.abs();
    let direction = if s.funding_z < 0.0 { "discount" } else { "premium" };
    let strength = match z {
        z if z >= 3.0 => "Very strong",
        z if z >= 2.5 => "Strong",
        z if z >= 2.0 => "Moderate",
        _ => return "Funding rates normal".to_string(),
    };
    format!("{} funding {} ({:.1}σ)", strength, direction, z)
}

pub fn oi_insight(s: &OpenInterestSnapshot) -> String {
    let r = s.oi_residual.abs();
    let direction = if s.oi_residual < 0.0 { "reduction" } else { "buildup" };
    let strength = match r {
        r if r >= 5_000_000.0 => "Major",
        r if r >= 2_000_000.0 => "Significant",
        r if r >= 1_000_000.0 => "Moderate",
        _ => return "OI activity normal".to_string(),
    };
    format!("{} OI {} (${:.1}M residual)", strength, direction, r / 1_000_000.0)
}

pub fn etf_insight(s: &EtfFlowSnapshot) -> String {
    let t = s.flow_tint.abs();
    let direction = if s.flow_tint < 0.0 { "outflow" } else { "inflow" };
    let strength = match t {
        t if t >= 0.018 => "Very strong",
        t if t >= 0.015 => "Strong",
        t if t >= 0.01 => "Moderate",
        _ => return "ETF flows balanced".to_string(),
    };
    format!("{} ETF {} ({:.1}% of ADV)", strength, direction, t * 100.0)
}

// =============================================================================
// MeasurementReadings
// =============================================================================

/// What each source answered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReadings {
    pub funding: Option<FundingSnapshot>,
    pub open_interest: Option<OpenInterestSnapshot>,
    pub etf_flows: Option<EtfFlowSnapshot>,
}

impl MeasurementReadings {
    /// Query every source; failures are logged and recorded as `None`.
    pub fn gather(source: &dyn MeasurementSource, symbol: &str) -> Self {
        fn keep<T>(res: Result<T, MeasurementError>) -> Option<T> {
            match res {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(error = %e, "measurement source unavailable");
                    None
                }
            }
        }

        Self {
            funding: keep(source.funding(symbol)),
            open_interest: keep(source.open_interest(symbol)),
            etf_flows: keep(source.etf_flows(symbol)),
        }
    }

    pub fn available(&self) -> usize {
        [
            self.funding.is_some(),
            self.open_interest.is_some(),
            self.etf_flows.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }

    pub fn data_quality(&self) -> DataQuality {
        DataQuality::from_available(self.available())
    }
}

// =============================================================================
// BoostedScore
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedScore {
    pub base: CompositeScore,
    pub funding_insight: String,
    pub oi_insight: String,
    pub etf_insight: String,
    pub measurements_boost: f64,
    /// Internal score plus boost, in [0, 100].
    pub final_score: f64,
    /// Social-inclusive score plus boost, in [0, 114].
    pub final_score_with_social: f64,
    pub data_quality: DataQuality,
    pub readings: MeasurementReadings,
}

impl BoostedScore {
    /// Layer the readings onto `base`.
    pub fn apply(base: CompositeScore, readings: MeasurementReadings, cap: f64) -> Self {
        let mut boost = 0.0;

        let funding_insight = match &readings.funding {
            Some(s) => {
                boost += funding_boost(s);
                funding_insight(s)
            }
            None => "Funding data unavailable".to_string(),
        };
        let oi_insight = match &readings.open_interest {
            Some(s) => {
                boost += oi_boost(s);
                oi_insight(s)
            }
            None => "OI data unavailable".to_string(),
        };
        let etf_insight = match &readings.etf_flows {
            Some(s) => {
                boost += etf_boost(s);
                etf_insight(s)
            }
            None => "ETF data unavailable".to_string(),
        };

        let measurements_boost = f64::min(boost, cap);
        let final_score = (base.internal_0_100 + measurements_boost).clamp(0.0, INTERNAL_MAX);
        let final_score_with_social =
            (base.final_with_social + measurements_boost).clamp(0.0, BOOSTED_FINAL_MAX);
        let data_quality = readings.data_quality();

        debug!(
            symbol = %base.symbol,
            boost = format!("{:.1}", measurements_boost),
            data_quality = %data_quality,
            "measurements boost applied"
        );

        Self {
            base,
            funding_insight,
            oi_insight,
            etf_insight,
            measurements_boost,
            final_score,
            final_score_with_social,
            data_quality,
            readings,
        }
    }

    /// Bounds of the boosted scores plus those of the base score.
    pub fn validate(&self) -> Result<(), BoundsViolation> {
        self.base.validate()?;
        let checks = [
            ("final_score", self.final_score, INTERNAL_MAX),
            ("final_score_with_social", self.final_score_with_social, BOOSTED_FINAL_MAX),
        ];
        for (field, value, max) in checks {
            if !(value.is_finite() && (0.0..=max).contains(&value)) {
                return Err(BoundsViolation {
                    symbol: self.base.symbol.clone(),
                    field,
                    value,
                    min: 0.0,
                    max,
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::input::fixtures::sample_input;
    use crate::scoring::Scorer;

    fn full(z: f64, divergence: bool, oi: f64, tint: f64) -> StaticMeasurements {
        StaticMeasurements {
            funding: Some(FundingSnapshot {
                funding_z: z,
                divergence_present: divergence,
            }),
            open_interest: Some(OpenInterestSnapshot { oi_residual: oi }),
            etf_flows: Some(EtfFlowSnapshot { flow_tint: tint }),
        }
    }

    #[test]
    fn funding_tiers_require_divergence() {
        let s = FundingSnapshot {
            funding_z: 3.1,
            divergence_present: false,
        };
        assert_eq!(funding_boost(&s), 0.0);
        assert_eq!(funding_insight(&s), "Funding rates normal");

        let s = FundingSnapshot {
            funding_z: -2.6,
            divergence_present: true,
        };
        assert_eq!(funding_boost(&s), 2.0);
        assert_eq!(funding_insight(&s), "Strong funding discount (2.6σ)");

        let s = FundingSnapshot {
            funding_z: 2.1,
            divergence_present: true,
        };
        assert_eq!(funding_boost(&s), 1.0);
        assert_eq!(funding_insight(&s), "Moderate funding premium (2.1σ)");
    }

    #[test]
    fn oi_and_etf_tiers() {
        let oi = OpenInterestSnapshot {
            oi_residual: 5_500_000.0,
        };
        assert_eq!(oi_boost(&oi), 1.5);
        assert_eq!(oi_insight(&oi), "Major OI buildup ($5.5M residual)");

        let oi = OpenInterestSnapshot {
            oi_residual: -1_200_000.0,
        };
        assert_eq!(oi_boost(&oi), 0.5);
        assert_eq!(oi_insight(&oi), "Moderate OI reduction ($1.2M residual)");

        let etf = EtfFlowSnapshot { flow_tint: -0.02 };
        assert_eq!(etf_boost(&etf), 1.0);
        assert_eq!(etf_insight(&etf), "Very strong ETF outflow (2.0% of ADV)");

        let etf = EtfFlowSnapshot { flow_tint: 0.005 };
        assert_eq!(etf_boost(&etf), 0.0);
        assert_eq!(etf_insight(&etf), "ETF flows balanced");
    }

    #[test]
    fn boost_is_capped_at_four() {
        let base = Scorer::default().score(&sample_input());
        let readings = MeasurementReadings::gather(&full(3.0, true, 3e6, 0.02), "BTCUSD");
        // 2.0 + 1.5 + 1.0 = 4.5 → capped
        let boosted = BoostedScore::apply(base.clone(), readings, DEFAULT_BOOST_CAP);
        assert_eq!(boosted.measurements_boost, 4.0);
        assert_eq!(boosted.data_quality, DataQuality::Complete);
        assert!(
            (boosted.final_score - (base.internal_0_100 + 4.0).min(100.0)).abs() < 1e-9
        );
        assert!(boosted.validate().is_ok());
    }

    #[test]
    fn boosted_scores_respect_extended_bounds() {
        let mut base = Scorer::default().score(&sample_input());
        base.internal_0_100 = 99.0;
        base.social_resid_capped = 10.0;
        base.final_with_social = 109.0;
        let readings = MeasurementReadings::gather(&full(3.0, true, 3e6, 0.02), "BTCUSD");
        let boosted = BoostedScore::apply(base, readings, DEFAULT_BOOST_CAP);
        assert_eq!(boosted.final_score, 100.0);
        assert_eq!(boosted.final_score_with_social, 113.0);
        assert!(boosted.validate().is_ok());
    }

    #[test]
    fn missing_sources_contribute_zero() {
        let base = Scorer::default().score(&sample_input());
        let source = StaticMeasurements {
            open_interest: Some(OpenInterestSnapshot {
                oi_residual: 2_500_000.0,
            }),
            ..StaticMeasurements::default()
        };
        let readings = MeasurementReadings::gather(&source, "BTCUSD");
        let boosted = BoostedScore::apply(base, readings, DEFAULT_BOOST_CAP);
        assert_eq!(boosted.measurements_boost, 1.5);
        assert_eq!(boosted.data_quality, DataQuality::Limited);
        assert_eq!(boosted.funding_insight, "Funding data unavailable");
        assert_eq!(boosted.etf_insight, "ETF data unavailable");
    }

    #[test]
    fn no_sources_is_incomplete() {
        let base = Scorer::default().score(&sample_input());
        let readings = MeasurementReadings::gather(&StaticMeasurements::default(), "BTCUSD");
        let boosted = BoostedScore::apply(base.clone(), readings, DEFAULT_BOOST_CAP);
        assert_eq!(boosted.measurements_boost, 0.0);
        assert_eq!(boosted.data_quality, DataQuality::Incomplete);
        assert!((boosted.final_score - base.internal_0_100).abs() < 1e-12);
    }

    #[test]
    fn static_source_reports_unavailable_error() {
        let err = StaticMeasurements::default().funding("SOLUSD").unwrap_err();
        assert!(err.to_string().contains("funding unavailable for SOLUSD"));
    }
}
