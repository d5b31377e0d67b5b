// =============================================================================
// Decision Engine: score → gates → explanation
// =============================================================================
//
// One engine per configuration.  Weights are validated once at construction;
// afterwards the engine holds only immutable state and can be shared across
// threads behind an `Arc`.
//
// Gate input score:
//   evaluate                    → internal_0_100
//   evaluate_with_measurements  → boosted final_score (internal + boost)
// =============================================================================

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::explain::{EnhancedExplanation, Explainer, Explanation};
use crate::factors::Orthogonalizer;
use crate::gates::{GateInput, GateResult, HardEntryGates};
use crate::scoring::{
    BoostedScore, MeasurementReadings, MeasurementSource, ScoreReport, Scorer, ScoringInput,
};

/// Market microstructure and timing at decision time.
///
/// 24h momentum and RSI4h are taken from the scoring input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub vadr: f64,
    pub funding_z: f64,
    pub bar_age: u32,
    /// Distance from the trigger price, in price units.
    #[serde(default)]
    pub atr_distance: f64,
    /// Zero disables the ATR check.
    #[serde(default)]
    pub atr_current: f64,
    pub spread_bps: f64,
    pub depth_usd: f64,
    pub micro_vadr: f64,
    pub signal_time: DateTime<Utc>,
    pub execution_time: DateTime<Utc>,
}

impl MarketContext {
    fn gate_input(&self, input: &ScoringInput, score: f64) -> GateInput {
        GateInput {
            symbol: input.symbol.clone(),
            score,
            vadr: self.vadr,
            funding_z: self.funding_z,
            bar_age: self.bar_age,
            atr_distance: self.atr_distance,
            atr_current: self.atr_current,
            spread_bps: self.spread_bps,
            depth_usd: self.depth_usd,
            micro_vadr: self.micro_vadr,
            momentum_24h: input.momentum.r24h,
            rsi_4h: input.technical.rsi_4h,
            signal_time: self.signal_time,
            execution_time: self.execution_time,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub report: ScoreReport,
    pub gates: GateResult,
    pub explanation: Explanation,
}

impl Decision {
    pub fn allowed(&self) -> bool {
        self.gates.allowed
    }
}

#[derive(Debug, Clone)]
pub struct EnhancedDecision {
    pub boosted: BoostedScore,
    pub gates: GateResult,
    pub explanation: EnhancedExplanation,
}

impl EnhancedDecision {
    pub fn allowed(&self) -> bool {
        self.gates.allowed
    }
}

#[derive(Debug)]
pub struct DecisionEngine {
    scorer: Scorer,
    gates: HardEntryGates,
    explainer: Explainer,
    boost_cap: f64,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            scorer: Scorer::default(),
            gates: HardEntryGates::new(config.gates.clone()),
            explainer: Explainer::new(Orthogonalizer::default(), config.gates),
            boost_cap: config.measurement_boost_cap,
        }
    }
}

impl DecisionEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let scorer = Scorer::from_config(&config)?;
        let orthogonalizer = *scorer.orthogonalizer();

        info!(
            default_regime = %scorer.table().default_regime(),
            tolerance = format!("{:.3}", orthogonalizer.tolerance()),
            min_score = format!("{:.1}", config.gates.min_composite_score),
            boost_cap = format!("{:.1}", config.measurement_boost_cap),
            "decision engine ready"
        );

        Ok(Self {
            scorer,
            gates: HardEntryGates::new(config.gates.clone()),
            explainer: Explainer::new(orthogonalizer, config.gates),
            boost_cap: config.measurement_boost_cap,
        })
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn evaluate(&self, input: &ScoringInput, market: &MarketContext) -> Decision {
        let started = Instant::now();

        let report = self.scorer.score_report(input);
        let gates = self
            .gates
            .evaluate_all(&market.gate_input(input, report.score.internal_0_100));
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let explanation = self.explainer.explain(&report, &gates, input, latency_ms);

        info!(
            symbol = %input.symbol,
            score = format!("{:.1}", report.score.internal_0_100),
            allowed = gates.allowed,
            reason = %gates.reason,
            latency_ms = format!("{:.2}", latency_ms),
            "entry decision"
        );

        Decision {
            report,
            gates,
            explanation,
        }
    }

    pub fn evaluate_with_measurements(
        &self,
        input: &ScoringInput,
        market: &MarketContext,
        source: &dyn MeasurementSource,
    ) -> EnhancedDecision {
        let started = Instant::now();

        let report = self.scorer.score_report(input);
        let readings = MeasurementReadings::gather(source, &input.symbol);
        let boosted = BoostedScore::apply(report.score.clone(), readings, self.boost_cap);
        let gates = self
            .gates
            .evaluate_all(&market.gate_input(input, boosted.final_score));
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let base = self.explainer.explain(&report, &gates, input, latency_ms);
        let explanation = EnhancedExplanation::new(base, &boosted);

        info!(
            symbol = %input.symbol,
            score = format!("{:.1}", boosted.final_score),
            boost = format!("{:.1}", boosted.measurements_boost),
            data_quality = %boosted.data_quality,
            allowed = gates.allowed,
            reason = %gates.reason,
            "entry decision with measurements"
        );

        EnhancedDecision {
            boosted,
            gates,
            explanation,
        }
    }
}
