// =============================================================================
// Regime Module
// =============================================================================
//
// Market regime classification consumed by the scorer:
// - `Regime`         closed variant (trending bull, choppy, high volatility)
// - `presets`        per-regime timeframe blend and category weight tables
// - `table`          the validated, immutable lookup injected at construction

pub mod kind;
pub mod presets;
pub mod table;

pub use kind::Regime;
pub use presets::{CategoryWeights, RegimePreset, TimeframeWeights};
pub use table::RegimeWeightTable;
