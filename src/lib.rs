// =============================================================================
// Momentum Gate: orthogonal factor scoring with hard entry gates
// =============================================================================
//
// Pipeline:
//   raw signals → factor vectors → Gram-Schmidt residuals
//   → regime-weighted contributions → composite score (+ social overlay)
//   → ten entry gates → explanation
//
// The core is synchronous and free of I/O; external measurements arrive
// through `scoring::MeasurementSource`.
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod explain;
pub mod factors;
pub mod gates;
pub mod indicators;
pub mod regime;
pub mod scoring;
pub mod types;

pub use config::EngineConfig;
pub use engine::{Decision, DecisionEngine, EnhancedDecision, MarketContext};
pub use error::{Error, Result};
pub use explain::{EnhancedExplanation, Explainer, Explanation};
pub use gates::{GateInput, GateResult, GateThresholds, HardEntryGates};
pub use regime::{Regime, RegimeWeightTable};
pub use scoring::{CompositeScore, MeasurementSource, Scorer, ScoringInput, StaticMeasurements};
pub use types::{DataQuality, GateFamily, ScoreComputation};
