// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free helpers used to build the catalyst factor from the
// raw catalyst price/volume series.  Every public function returns
// `Option<T>` so callers are forced to handle insufficient data.

pub mod compression;
pub mod roc;

pub use compression::{bandwidth, compression_score, volume_expansion, BandWidth};
pub use roc::current_roc;
