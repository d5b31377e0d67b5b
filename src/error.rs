// =============================================================================
// Errors: typed failure modes of the scoring core
// =============================================================================
//
// Every failure is returned to the caller with enough context (symbol, key,
// offending value) to log or alert.  Nothing in the core panics.
// =============================================================================

use thiserror::Error;

/// Malformed factor input, or a numeric failure during Gram-Schmidt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrthogonalizationError {
    #[error("expected {expected} factors, got {actual}")]
    FactorCount { expected: String, actual: usize },

    #[error("first factor must be protected momentum_core, got {name} (protected={protected})")]
    UnprotectedMomentum { name: String, protected: bool },

    #[error("factor {name} has {actual} components, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("factor {name} has non-finite component at index {index}")]
    NonFinite { name: String, index: usize },

    #[error("factors {a} and {b} not orthogonal: dot {dot:.6} exceeds tolerance {tolerance}")]
    NotOrthogonal {
        a: String,
        b: String,
        dot: f64,
        tolerance: f64,
    },
}

/// Invalid regime weight table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WeightError {
    #[error("regime {regime} is missing weight key {key}")]
    MissingKey { regime: String, key: String },

    #[error("regime {regime} has negative weight for {key}: {value:.4}")]
    NegativeWeight {
        regime: String,
        key: String,
        value: f64,
    },

    #[error("regime {regime} weights sum to {sum:.4}, expected 1.0 ± {tolerance}")]
    SumDrift {
        regime: String,
        sum: f64,
        tolerance: f64,
    },

    #[error("no weight preset configured for regime {0}")]
    UnknownRegimePreset(String),

    #[error("regime {regime} configured twice (as {first} and {second})")]
    DuplicateRegime {
        regime: String,
        first: String,
        second: String,
    },
}

/// The weighted, pre-social total fell outside its sanity range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("pre-social total {total:.2} outside [{min}, {max}]")]
    TotalOutOfRange { total: f64, min: f64, max: f64 },
}

/// A finished score carries a value outside its documented range.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{symbol}: {field} {value:.2} outside [{min}, {max}]")]
pub struct BoundsViolation {
    pub symbol: String,
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// A scalar engine setting that must be finite and non-negative is not.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("setting {field} must be finite and non-negative, got {value}")]
pub struct InvalidSetting {
    pub field: &'static str,
    pub value: f64,
}

/// An external measurement source did not answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasurementError {
    #[error("{source_name} unavailable for {symbol}: {reason}")]
    Unavailable {
        source_name: String,
        symbol: String,
        reason: String,
    },
}

/// Umbrella error for the public API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("orthogonalization: {0}")]
    Orthogonalization(#[from] OrthogonalizationError),

    #[error("weights: {0}")]
    Weights(#[from] WeightError),

    #[error("config: {0}")]
    Setting(#[from] InvalidSetting),

    #[error("normalization: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("bounds: {0}")]
    Bounds(#[from] BoundsViolation),

    #[error("measurement: {0}")]
    Measurement(#[from] MeasurementError),
}

pub type Result<T> = std::result::Result<T, Error>;
