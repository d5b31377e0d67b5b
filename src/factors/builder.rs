// =============================================================================
// Factor Builder
// =============================================================================
//
// Turns raw `ScoringInput` readings into pre-scaled factor vectors, each
// component roughly in [0, 1]:
//
//   momentum   [MomentumCore × 0.1]                        (protected)
//   technical  [RSI4h / 100, ADX1h / 100, Hurst]
//   volume     [surge / 5, ΔOI]
//   quality    [OI / 1e6, reserve ratio, ETF flows / 1e5, venue health]
//   catalyst   [BB compression, volume expansion / 5, ROC10 / 10]
//
// The catalyst vector is only built with at least 20 price bars.  The four
// core factors already span their shared space, so the catalyst is laid out
// on three extra axes after it; see `FactorSet::aligned`.

use tracing::trace;

use crate::factors::FactorVector;
use crate::indicators::{compression_score, current_roc, volume_expansion};
use crate::regime::TimeframeWeights;
use crate::scoring::ScoringInput;

pub const MOMENTUM_SCALE: f64 = 0.1;
pub const OSCILLATOR_SCALE: f64 = 100.0;
pub const VOLUME_SURGE_SCALE: f64 = 5.0;
pub const OI_SCALE: f64 = 1_000_000.0;
pub const ETF_FLOW_SCALE: f64 = 100_000.0;

pub const CATALYST_MIN_BARS: usize = 20;
const CATALYST_ROC_PERIOD: usize = 10;
const CATALYST_ROC_SCALE: f64 = 10.0;

/// Supplies the factor vectors for one scoring request.
pub trait FactorBuilder: Send + Sync {
    fn build(&self, input: &ScoringInput, timeframe: &TimeframeWeights) -> FactorSet;
}

// =============================================================================
// FactorSet
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FactorSet {
    /// Timeframe blend of percent returns, before scaling.
    pub momentum_core: f64,
    pub momentum: FactorVector,
    pub technical: FactorVector,
    pub volume: FactorVector,
    pub quality: FactorVector,
    pub catalyst: Option<FactorVector>,
}

impl FactorSet {
    /// Largest component count across the four core vectors.
    pub fn core_dimension(&self) -> usize {
        self.core().iter().map(|f| f.len()).max().unwrap_or(0)
    }

    /// Length of every vector returned by `aligned`.
    pub fn dimension(&self) -> usize {
        self.core_dimension() + self.catalyst.as_ref().map_or(0, FactorVector::len)
    }

    /// All vectors in orthogonalizer order, zero-padded to a common length.
    ///
    /// Core vectors keep their own slots.  The catalyst is shifted past the
    /// core dimension; zero-padded into the core slots it would lie in the
    /// span of the four core residuals and always project to zero.
    pub fn aligned(&self) -> Vec<FactorVector> {
        let core_dim = self.core_dimension();
        let dim = self.dimension();
        let mut out: Vec<FactorVector> = self.core().into_iter().map(|f| f.padded(dim)).collect();
        if let Some(c) = &self.catalyst {
            out.push(c.shifted(core_dim));
        }
        out
    }

    fn core(&self) -> [&FactorVector; 4] {
        [&self.momentum, &self.technical, &self.volume, &self.quality]
    }
}

// =============================================================================
// StandardFactorBuilder
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFactorBuilder;

impl StandardFactorBuilder {
    fn catalyst(input: &ScoringInput) -> Option<FactorVector> {
        let prices = &input.catalyst.prices;
        if prices.len() < CATALYST_MIN_BARS {
            return None;
        }

        let compression = compression_score(prices).unwrap_or(0.0);
        let expansion = volume_expansion(&input.catalyst.volumes)
            .map(|r| r / VOLUME_SURGE_SCALE)
            .unwrap_or(0.0);
        let drift = current_roc(prices, CATALYST_ROC_PERIOD)
            .map(|r| r / CATALYST_ROC_SCALE)
            .unwrap_or(0.0);

        trace!(
            symbol = %input.symbol,
            compression = format!("{:.3}", compression),
            expansion = format!("{:.3}", expansion),
            drift = format!("{:.3}", drift),
            "catalyst factor built"
        );

        Some(FactorVector::new("catalyst", vec![compression, expansion, drift]))
    }
}

impl FactorBuilder for StandardFactorBuilder {
    fn build(&self, input: &ScoringInput, timeframe: &TimeframeWeights) -> FactorSet {
        let momentum_core = timeframe.blend(input.momentum.as_array());

        let t = &input.technical;
        let v = &input.volume;
        let q = &input.quality;

        FactorSet {
            momentum_core,
            momentum: FactorVector::protected("momentum_core", vec![momentum_core * MOMENTUM_SCALE]),
            technical: FactorVector::new(
                "technical",
                vec![t.rsi_4h / OSCILLATOR_SCALE, t.adx_1h / OSCILLATOR_SCALE, t.hurst],
            ),
            volume: FactorVector::new("volume", vec![v.volume_surge / VOLUME_SURGE_SCALE, v.delta_oi]),
            quality: FactorVector::new(
                "quality",
                vec![
                    q.oi_absolute / OI_SCALE,
                    q.reserve_ratio,
                    q.etf_flows / ETF_FLOW_SCALE,
                    q.venue_health,
                ],
            ),
            catalyst: Self::catalyst(input),
        }
    }
}
