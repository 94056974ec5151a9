// =============================================================================
// Average True Range (ATR)
// =============================================================================
//
// ATR measures volatility by decomposing the entire range of a bar.
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the plain average of the trailing `period` TR values. Used by the
// percentile engine to widen stop distances in volatile conditions.

use crate::market_data::OhlcvBar;

/// Compute the ATR over the trailing `period` true-range values.
///
/// # Arguments
/// - `bars`   — OHLCV bars of a single timeframe, oldest first.
/// - `period` — look-back window for the average.
///
/// # Returns
/// `None` when:
/// - `period` is zero.
/// - There are fewer than `period + 1` bars (each TR value needs a previous
///   bar for the prev-close leg).
/// - Any intermediate value is non-finite.
pub fn calculate_atr(bars: &[&OhlcvBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }

    let mut tr_values: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let high = bars[i].high;
        let low = bars[i].low;
        let prev_close = bars[i - 1].close;

        let hl = high - low;
        let hc = (high - prev_close).abs();
        let lc = (low - prev_close).abs();

        tr_values.push(hl.max(hc).max(lc));
    }

    let tail = &tr_values[tr_values.len() - period..];
    let atr = tail.iter().sum::<f64>() / period as f64;

    if atr.is_finite() {
        Some(atr)
    } else {
        None
    }
}
