// =============================================================================
// Entry Gates Module
// =============================================================================
//
// Hard entry gates evaluated after scoring.  Five independent families
// (composite, freshness, microstructure, fatigue, policy) must all pass.

pub mod entry;
pub mod thresholds;

pub use entry::{GateInput, GateResult, HardEntryGates};
pub use thresholds::GateThresholds;
