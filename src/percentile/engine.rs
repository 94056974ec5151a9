// =============================================================================
// Percentile Engine — statistical extremes over bar history
// =============================================================================
//
// Pure computations over already-materialized bar slices. The engine ranks
// the live price against the trailing close distribution and fires an entry
// signal only at the tails:
//
//   percentile >= threshold        → SHORT (price at upper extreme)
//   percentile <= 100 - threshold  → LONG  (price at lower extreme)
//
// With adaptive thresholds enabled the base threshold shifts per regime:
// momentum +5 (cap 95), mean-reversion -5 (floor 80), transition +3 (cap 95).
// The mean-reversion floor stays at 80 regardless of the configured base so
// mean-reversion entries never fire inside the interquartile noise band.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QuantError, Result};
use crate::market_data::{MarketData, Timeframe};
use crate::regime::RegimeType;

// =============================================================================
// Types
// =============================================================================

/// Trade direction of a signal or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// A computed percentile value together with the window that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileData {
    pub value: f64,
    /// The percentile that was requested [0, 100].
    pub percentile: f64,
    pub lookback_period: usize,
    pub timeframe: Timeframe,
}

/// Transient entry signal. Consumed once by the orchestrator, never retained
/// by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileEntry {
    pub instrument: String,
    pub current_price: f64,
    /// Price-percentile rank at signal time [0, 100].
    pub percentile_level: f64,
    /// The (possibly regime-adjusted) threshold the rank was compared to.
    pub entry_threshold: f64,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
}

/// Diagnostic percentile snapshot of the lookback close distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileStats {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub current_price: f64,
}

// =============================================================================
// Configuration
// =============================================================================

/// Engine parameters. The configuration is an immutable value; derive a new
/// engine via [`PercentileEngine::with_config`] to change it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentileConfig {
    /// Trailing bars per timeframe used for every distribution.
    pub lookback_bars: usize,
    /// Base entry threshold [0, 100].
    pub entry_percentile: f64,
    /// Percentile of the close-to-close move distribution used as the stop
    /// distance.
    pub stop_percentile: f64,
    /// Shift the entry threshold per regime when one is supplied.
    pub adaptive_thresholds: bool,
    /// When set, the stop distance is widened to at least ATR × multiplier.
    pub atr_multiplier: Option<f64>,
}

impl Default for PercentileConfig {
    fn default() -> Self {
        Self {
            lookback_bars: 100,
            entry_percentile: 90.0,
            stop_percentile: 95.0,
            adaptive_thresholds: true,
            atr_multiplier: None,
        }
    }
}

// =============================================================================
// PercentileEngine
// =============================================================================

/// Stateless-per-call percentile engine. Holds only its configuration, so a
/// shared instance is safe to call from concurrent contexts.
#[derive(Debug, Clone, Default)]
pub struct PercentileEngine {
    config: PercentileConfig,
}

impl PercentileEngine {
    pub fn new(config: PercentileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PercentileConfig {
        &self.config
    }

    /// Derive a new engine with a replaced configuration.
    pub fn with_config(&self, config: PercentileConfig) -> Self {
        Self { config }
    }

    /// Linear-interpolated percentile of an arbitrary value set.
    ///
    /// Sorts ascending and interpolates between the two bracketing ranks at
    /// fractional index `p/100 * (n-1)`. `calculate_percentile(v, 0)` is the
    /// minimum and `calculate_percentile(v, 100)` the maximum.
    pub fn calculate_percentile(&self, values: &[f64], percentile: f64) -> Result<f64> {
        interpolated_percentile(values, percentile, "percentile values")
    }

    /// Percentile rank of the live price within the trailing close
    /// distribution of `timeframe`: the fraction of closes strictly below
    /// `current_price`, expressed 0–100.
    ///
    /// Fails when fewer than 2 bars remain after timeframe filtering. A flat
    /// series ranks the price at 0 (nothing strictly below), not an error.
    pub fn calculate_price_percentile(
        &self,
        market: &MarketData,
        timeframe: Timeframe,
    ) -> Result<f64> {
        let closes = market.trailing_closes(timeframe, self.config.lookback_bars);
        if closes.len() < 2 {
            return Err(QuantError::InsufficientBars {
                timeframe,
                have: closes.len(),
                need: 2,
            });
        }

        let below = closes
            .iter()
            .filter(|&&close| close < market.current_price)
            .count();
        Ok(below as f64 / closes.len() as f64 * 100.0)
    }

    /// Check the live price against the (regime-adjusted) entry threshold.
    ///
    /// Returns `Ok(None)` when the price sits between the extremes. At most
    /// one direction can fire per call; the upper extreme is checked first
    /// and the two ranges are disjoint whenever the threshold exceeds 50.
    pub fn generate_entry_signal(
        &self,
        market: &MarketData,
        timeframe: Timeframe,
        regime: Option<RegimeType>,
    ) -> Result<Option<PercentileEntry>> {
        let percentile = self.calculate_price_percentile(market, timeframe)?;
        let threshold = self.adjusted_entry_threshold(regime);

        let direction = if percentile >= threshold {
            Some(Direction::Short)
        } else if percentile <= 100.0 - threshold {
            Some(Direction::Long)
        } else {
            None
        };

        let Some(direction) = direction else {
            return Ok(None);
        };

        debug!(
            instrument = %market.instrument,
            timeframe = %timeframe,
            direction = %direction,
            percentile = format!("{:.2}", percentile),
            threshold = format!("{:.2}", threshold),
            "Percentile entry signal"
        );

        Ok(Some(PercentileEntry {
            instrument: market.instrument.clone(),
            current_price: market.current_price,
            percentile_level: percentile,
            entry_threshold: threshold,
            direction,
            timestamp: Utc::now(),
        }))
    }

    /// Diagnostic snapshot of the lookback close distribution. No side
    /// effects.
    pub fn percentile_stats(
        &self,
        market: &MarketData,
        timeframe: Timeframe,
    ) -> Result<PercentileStats> {
        let closes = market.trailing_closes(timeframe, self.config.lookback_bars);
        if closes.len() < 2 {
            return Err(QuantError::InsufficientBars {
                timeframe,
                have: closes.len(),
                need: 2,
            });
        }

        let p = |pct: f64| interpolated_percentile(&closes, pct, "lookback closes");
        Ok(PercentileStats {
            p10: p(10.0)?,
            p25: p(25.0)?,
            p50: p(50.0)?,
            p75: p(75.0)?,
            p90: p(90.0)?,
            p95: p(95.0)?,
            p99: p(99.0)?,
            current_price: market.current_price,
        })
    }

    /// Entry threshold after the per-regime shift.
    pub(crate) fn adjusted_entry_threshold(&self, regime: Option<RegimeType>) -> f64 {
        let base = self.config.entry_percentile;
        if !self.config.adaptive_thresholds {
            return base;
        }
        match regime {
            Some(RegimeType::Momentum) => (base + 5.0).min(95.0),
            Some(RegimeType::MeanReversion) => (base - 5.0).max(80.0),
            Some(RegimeType::Transition) => (base + 3.0).min(95.0),
            Some(RegimeType::Neutral) | None => base,
        }
    }
}

// =============================================================================
// Percentile interpolation
// =============================================================================

/// Percentile of a value set using linear interpolation between the two
/// bracketing ranks. Shared by the engine methods and the stop-loss sizing.
pub(crate) fn interpolated_percentile(
    values: &[f64],
    percentile: f64,
    context: &'static str,
) -> Result<f64> {
    if values.is_empty() {
        return Err(QuantError::EmptySeries { context });
    }
    if !(0.0..=100.0).contains(&percentile) {
        return Err(QuantError::PercentileOutOfRange { value: percentile });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = percentile / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - lo as f64;

    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::OhlcvBar;

    fn bar(timeframe: Timeframe, close: f64) -> OhlcvBar {
        OhlcvBar {
            timeframe,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100.0,
            timestamp: Utc::now(),
        }
    }

    fn market_from_closes(closes: &[f64], current_price: f64) -> MarketData {
        MarketData {
            instrument: "BTCUSDT".to_string(),
            current_price,
            bars: closes.iter().map(|&c| bar(Timeframe::H1, c)).collect(),
        }
    }

    #[test]
    fn percentile_zero_is_min_and_hundred_is_max() {
        let engine = PercentileEngine::default();
        let values = [7.0, 3.0, 9.0, 1.0, 5.0];
        assert_eq!(engine.calculate_percentile(&values, 0.0).unwrap(), 1.0);
        assert_eq!(engine.calculate_percentile(&values, 100.0).unwrap(), 9.0);
    }

    #[test]
    fn percentile_exact_median_no_interpolation() {
        let engine = PercentileEngine::default();
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        // Fractional index 0.5 * 4 = 2.0 is integral: exact rank.
        assert_eq!(engine.calculate_percentile(&values, 50.0).unwrap(), 3.0);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        let engine = PercentileEngine::default();
        let values = [10.0, 20.0];
        // Index 0.25 * 1 = 0.25 → 10 + 0.25 * (20 - 10).
        let v = engine.calculate_percentile(&values, 25.0).unwrap();
        assert!((v - 12.5).abs() < 1e-10);
    }

    #[test]
    fn percentile_monotonic_in_requested_percentile() {
        let engine = PercentileEngine::default();
        let values = [4.0, 8.0, 15.0, 16.0, 23.0, 42.0, 1.0];
        let mut prev = f64::NEG_INFINITY;
        for p in 0..=100 {
            let v = engine.calculate_percentile(&values, p as f64).unwrap();
            assert!(v >= prev, "p{p}: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn percentile_rejects_bad_input() {
        let engine = PercentileEngine::default();
        assert_eq!(
            engine.calculate_percentile(&[], 50.0),
            Err(QuantError::EmptySeries {
                context: "percentile values"
            })
        );
        assert!(matches!(
            engine.calculate_percentile(&[1.0], -0.1),
            Err(QuantError::PercentileOutOfRange { .. })
        ));
        assert!(matches!(
            engine.calculate_percentile(&[1.0], 100.5),
            Err(QuantError::PercentileOutOfRange { .. })
        ));
    }

    #[test]
    fn price_percentile_counts_strictly_below() {
        let engine = PercentileEngine::default();
        let market = market_from_closes(&[1.0, 2.0, 3.0, 4.0], 3.5);
        // 3 of 4 closes strictly below 3.5.
        let rank = engine
            .calculate_price_percentile(&market, Timeframe::H1)
            .unwrap();
        assert!((rank - 75.0).abs() < 1e-10);
    }

    #[test]
    fn price_percentile_flat_series_ranks_zero() {
        let engine = PercentileEngine::default();
        let market = market_from_closes(&[10.0; 19], 10.0);
        let rank = engine
            .calculate_price_percentile(&market, Timeframe::H1)
            .unwrap();
        assert_eq!(rank, 0.0);
    }

    #[test]
    fn price_percentile_needs_two_bars() {
        let engine = PercentileEngine::default();
        let market = market_from_closes(&[10.0], 10.0);
        assert_eq!(
            engine.calculate_price_percentile(&market, Timeframe::H1),
            Err(QuantError::InsufficientBars {
                timeframe: Timeframe::H1,
                have: 1,
                need: 2,
            })
        );
        // Bars exist but none on the requested timeframe.
        assert!(engine
            .calculate_price_percentile(&market, Timeframe::M5)
            .is_err());
    }

    #[test]
    fn price_percentile_uses_only_lookback_window() {
        let config = PercentileConfig {
            lookback_bars: 4,
            ..Default::default()
        };
        let engine = PercentileEngine::new(config);
        // Old closes far below, trailing 4 far above the live price.
        let market = market_from_closes(&[1.0, 1.0, 1.0, 200.0, 200.0, 200.0, 200.0], 100.0);
        let rank = engine
            .calculate_price_percentile(&market, Timeframe::H1)
            .unwrap();
        assert_eq!(rank, 0.0);
    }

    #[test]
    fn entry_signal_short_at_upper_extreme() {
        let engine = PercentileEngine::default();
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let market = market_from_closes(&closes, 25.0); // above every close
        let entry = engine
            .generate_entry_signal(&market, Timeframe::H1, None)
            .unwrap()
            .expect("upper extreme should fire");
        assert_eq!(entry.direction, Direction::Short);
        assert!((entry.percentile_level - 100.0).abs() < 1e-10);
        assert!((entry.entry_threshold - 90.0).abs() < 1e-10);
        assert_eq!(entry.instrument, "BTCUSDT");
    }

    #[test]
    fn entry_signal_long_at_lower_extreme() {
        let engine = PercentileEngine::default();
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let market = market_from_closes(&closes, 0.5); // below every close
        let entry = engine
            .generate_entry_signal(&market, Timeframe::H1, None)
            .unwrap()
            .expect("lower extreme should fire");
        assert_eq!(entry.direction, Direction::Long);
    }

    #[test]
    fn entry_signal_none_between_extremes() {
        let engine = PercentileEngine::default();
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let market = market_from_closes(&closes, 10.5); // mid-distribution
        let entry = engine
            .generate_entry_signal(&market, Timeframe::H1, None)
            .unwrap();
        assert!(entry.is_none());
    }

    #[test]
    fn entry_signal_never_fires_both_directions() {
        let engine = PercentileEngine::default();
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        for price in [0.5, 5.0, 10.5, 15.0, 25.0] {
            let market = market_from_closes(&closes, price);
            // One call, at most one direction.
            let entry = engine
                .generate_entry_signal(&market, Timeframe::H1, None)
                .unwrap();
            if let Some(e) = entry {
                let rank = engine
                    .calculate_price_percentile(&market, Timeframe::H1)
                    .unwrap();
                match e.direction {
                    Direction::Short => assert!(rank >= e.entry_threshold),
                    Direction::Long => assert!(rank <= 100.0 - e.entry_threshold),
                }
            }
        }
    }

    #[test]
    fn adaptive_threshold_shifts_per_regime() {
        let engine = PercentileEngine::default(); // base 90
        assert_eq!(
            engine.adjusted_entry_threshold(Some(RegimeType::Momentum)),
            95.0
        );
        assert_eq!(
            engine.adjusted_entry_threshold(Some(RegimeType::MeanReversion)),
            85.0
        );
        assert_eq!(
            engine.adjusted_entry_threshold(Some(RegimeType::Transition)),
            93.0
        );
        assert_eq!(
            engine.adjusted_entry_threshold(Some(RegimeType::Neutral)),
            90.0
        );
        assert_eq!(engine.adjusted_entry_threshold(None), 90.0);
    }

    #[test]
    fn adaptive_threshold_caps_and_floors() {
        let high = PercentileEngine::new(PercentileConfig {
            entry_percentile: 94.0,
            ..Default::default()
        });
        // Momentum +5 capped at 95, transition +3 capped at 95.
        assert_eq!(high.adjusted_entry_threshold(Some(RegimeType::Momentum)), 95.0);
        assert_eq!(
            high.adjusted_entry_threshold(Some(RegimeType::Transition)),
            95.0
        );

        let low = PercentileEngine::new(PercentileConfig {
            entry_percentile: 82.0,
            ..Default::default()
        });
        // Mean-reversion -5 floored at 80.
        assert_eq!(
            low.adjusted_entry_threshold(Some(RegimeType::MeanReversion)),
            80.0
        );
    }

    #[test]
    fn adaptive_threshold_disabled_ignores_regime() {
        let engine = PercentileEngine::new(PercentileConfig {
            adaptive_thresholds: false,
            ..Default::default()
        });
        assert_eq!(
            engine.adjusted_entry_threshold(Some(RegimeType::Momentum)),
            90.0
        );
    }

    #[test]
    fn stats_are_ordered_and_carry_price() {
        let engine = PercentileEngine::default();
        let closes: Vec<f64> = (1..=50).map(|i| i as f64).collect();
        let market = market_from_closes(&closes, 42.0);
        let stats = engine.percentile_stats(&market, Timeframe::H1).unwrap();
        assert!(stats.p10 <= stats.p25);
        assert!(stats.p25 <= stats.p50);
        assert!(stats.p50 <= stats.p75);
        assert!(stats.p75 <= stats.p90);
        assert!(stats.p90 <= stats.p95);
        assert!(stats.p95 <= stats.p99);
        assert_eq!(stats.current_price, 42.0);
        assert_eq!(stats.p50, 25.5);
    }

    #[test]
    fn with_config_derives_new_engine() {
        let engine = PercentileEngine::default();
        let derived = engine.with_config(PercentileConfig {
            lookback_bars: 50,
            ..engine.config().clone()
        });
        assert_eq!(engine.config().lookback_bars, 100);
        assert_eq!(derived.config().lookback_bars, 50);
    }
}
