// =============================================================================
// Explain Module
// =============================================================================
//
// Read-only audit trail for a scored and gated decision:
// - `explainer`  base explanation: factors, weights, gates, reasons
// - `enhanced`   base explanation plus measurement insights and coverage

pub mod enhanced;
pub mod explainer;

pub use enhanced::EnhancedExplanation;
pub use explainer::{Explainer, Explanation, GateExplanation, GatePerformance, OrthogonalityInfo};
