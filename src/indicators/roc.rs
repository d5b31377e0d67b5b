// =============================================================================
// Rate of Change (ROC)
// =============================================================================
//
//   ROC = ((price - price_n) / price_n) * 100
//
// Used as the drift component of the catalyst factor.

/// Most recent ROC over `period` bars, in percent.
///
/// Returns `None` with fewer than `period + 1` prices or a zero base price.
pub fn current_roc(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() <= period {
        return None;
    }
    let last = prices[prices.len() - 1];
    let base = prices[prices.len() - 1 - period];
    if base == 0.0 {
        return None;
    }
    let roc = (last - base) / base * 100.0;
    roc.is_finite().then_some(roc)
}
