// =============================================================================
// Scoring Module
// =============================================================================
//
// Raw inputs → orthogonal residuals → regime-weighted composite score:
// - `input`         per-request raw signal readings
// - `normalizer`    residual scalars and 60-point-capped contributions
// - `composite`     the scorer, the immutable score and its fallback path
// - `measurements`  bounded funding / OI / ETF boost on top of a score

pub mod composite;
pub mod input;
pub mod measurements;
pub mod normalizer;

pub use composite::{CompositeScore, ScoreReport, Scorer};
pub use input::ScoringInput;
pub use measurements::{BoostedScore, MeasurementReadings, MeasurementSource, StaticMeasurements};
pub use normalizer::{
    CategoryContributions, Normalizer, QualityComponents, ResidualScalars, VolumeComponents,
};
