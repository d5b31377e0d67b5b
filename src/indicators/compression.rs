// =============================================================================
// Bollinger Compression & Volume Expansion
// =============================================================================
//
// A catalyst setup is a tight range (low Bollinger Band Width) followed by
// a volume expansion.  BBW is the normalised band distance:
//   BBW = (upper - lower) / middle * 100
//
// The compression score maps BBW onto [0, 1]: 1.0 for a perfectly flat
// window, 0.0 once the width reaches `COMPRESSION_REF_BBW` or more.

/// Width at which a window no longer counts as compressed (percent).
pub const COMPRESSION_REF_BBW: f64 = 10.0;

/// Bollinger bands over the trailing window.
#[derive(Debug, Clone)]
pub struct BandWidth {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
}

/// Bollinger bands over the last `period` prices.
///
/// Returns `None` for fewer than `period` prices, a zero middle band, or a
/// non-finite width.
pub fn bandwidth(prices: &[f64], period: usize, num_std: f64) -> Option<BandWidth> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    if middle == 0.0 {
        return None;
    }

    let variance = window.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    let upper = middle + num_std * std_dev;
    let lower = middle - num_std * std_dev;
    let width = (upper - lower) / middle.abs() * 100.0;

    width.is_finite().then_some(BandWidth {
        upper,
        middle,
        lower,
        width,
    })
}

/// Compression in [0, 1] from the 20-period, 2σ band width.
pub fn compression_score(prices: &[f64]) -> Option<f64> {
    let bb = bandwidth(prices, 20, 2.0)?;
    Some(1.0 - (bb.width / COMPRESSION_REF_BBW).clamp(0.0, 1.0))
}

/// Last volume bar relative to the mean of the whole series.
pub fn volume_expansion(volumes: &[f64]) -> Option<f64> {
    let last = *volumes.last()?;
    let mean = volumes.iter().sum::<f64>() / volumes.len() as f64;
    if mean <= 0.0 || !mean.is_finite() {
        return None;
    }
    let ratio = last / mean;
    ratio.is_finite().then_some(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandwidth_basic() {
        let prices: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = bandwidth(&prices, 20, 2.0).unwrap();
        assert!(bb.upper > bb.middle);
        assert!(bb.lower < bb.middle);
        assert!(bb.width > 0.0);
    }

    #[test]
    fn bandwidth_insufficient_data() {
        assert!(bandwidth(&[1.0, 2.0, 3.0], 20, 2.0).is_none());
        assert!(compression_score(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn flat_window_is_fully_compressed() {
        let prices = vec![100.0; 20];
        let score = compression_score(&prices).unwrap();
        assert!((score - 1.0).abs() < 1e-10);
    }

    #[test]
    fn wide_window_has_no_compression() {
        let prices: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 80.0 } else { 120.0 }).collect();
        let score = compression_score(&prices).unwrap();
        assert!(score.abs() < 1e-10);
    }

    #[test]
    fn volume_expansion_ratio() {
        let volumes = vec![100.0, 100.0, 100.0, 500.0];
        // mean = 200, last = 500
        assert!((volume_expansion(&volumes).unwrap() - 2.5).abs() < 1e-10);
        assert!(volume_expansion(&[]).is_none());
        assert!(volume_expansion(&[0.0, 0.0]).is_none());
    }
}
