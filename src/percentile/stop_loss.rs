// =============================================================================
// Adaptive Stop Loss — percentile-sized, regime-aware trailing
// =============================================================================
//
// The stop distance is the `stop_percentile`-th percentile of the trailing
// close-to-close move distribution, optionally widened to ATR × multiplier.
// Updates never mutate the existing record: every call returns a fresh
// snapshot and the caller decides whether to replace the one it holds.
//
// Trailing rules (ratchet — only tighten, never loosen):
//   MOMENTUM        trail at 50% of the original percentile distance
//   MEAN_REVERSION  step toward initial_stop ± 25% of (75% of the distance)
//   anything else   leave the stop untouched

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{QuantError, Result};
use crate::indicators::calculate_atr;
use crate::market_data::{MarketData, OhlcvBar, Timeframe};
use crate::regime::RegimeType;

use super::engine::{interpolated_percentile, Direction, PercentileData, PercentileEngine};

/// Fraction of the percentile distance used as the momentum trail.
const MOMENTUM_TRAIL_FRACTION: f64 = 0.50;
/// Fraction of the percentile distance treated as the tightening range in a
/// mean-reversion regime.
const MEAN_REVERSION_RANGE_FRACTION: f64 = 0.75;
/// Fraction of that range the stop steps toward breakeven per update.
const MEAN_REVERSION_STEP_FRACTION: f64 = 0.25;
/// Look-back for the ATR widening path.
const ATR_PERIOD: usize = 14;

/// A stop-loss snapshot. `initial_stop` is set once at creation and never
/// changes across the record chain; `current_stop` moves only through
/// [`PercentileEngine::update_stop_loss`], which returns a new record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveStopLoss {
    pub initial_stop: f64,
    pub current_stop: f64,
    /// The raw percentile move distance that sized the stop (pre-ATR
    /// widening); the trailing rules are defined in terms of this value.
    pub percentile_based: PercentileData,
    pub atr_multiplier: Option<f64>,
    pub risk_amount: f64,
    /// Why the stop moved in the producing call; `None` when it did not.
    pub update_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PercentileEngine {
    /// Size a stop for a fresh position.
    ///
    /// The base distance is the `stop_percentile`-th percentile of the
    /// absolute close-to-close moves over the lookback window. With an ATR
    /// multiplier configured, the distance is widened to
    /// `max(percentile_distance, atr * multiplier)`.
    pub fn calculate_stop_loss(
        &self,
        market: &MarketData,
        entry_price: f64,
        direction: Direction,
        timeframe: Timeframe,
        risk_amount: f64,
    ) -> Result<AdaptiveStopLoss> {
        let config = self.config();
        let closes = market.trailing_closes(timeframe, config.lookback_bars);
        if closes.len() < 2 {
            return Err(QuantError::InsufficientBars {
                timeframe,
                have: closes.len(),
                need: 2,
            });
        }

        let moves: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        let percentile_distance =
            interpolated_percentile(&moves, config.stop_percentile, "close-to-close moves")?;

        let mut distance = percentile_distance;
        if let Some(multiplier) = config.atr_multiplier {
            let bars: Vec<&OhlcvBar> = market.bars_for(timeframe).collect();
            let start = bars.len().saturating_sub(config.lookback_bars);
            if let Some(atr) = calculate_atr(&bars[start..], ATR_PERIOD) {
                distance = distance.max(atr * multiplier);
            }
        }

        let initial_stop = match direction {
            Direction::Long => entry_price - distance,
            Direction::Short => entry_price + distance,
        };

        debug!(
            instrument = %market.instrument,
            timeframe = %timeframe,
            direction = %direction,
            entry_price = format!("{:.4}", entry_price),
            stop = format!("{:.4}", initial_stop),
            percentile_distance = format!("{:.6}", percentile_distance),
            distance = format!("{:.6}", distance),
            "Stop loss sized"
        );

        Ok(AdaptiveStopLoss {
            initial_stop,
            current_stop: initial_stop,
            percentile_based: PercentileData {
                value: percentile_distance,
                percentile: config.stop_percentile,
                lookback_period: config.lookback_bars,
                timeframe,
            },
            atr_multiplier: config.atr_multiplier,
            risk_amount,
            update_reason: None,
            timestamp: Utc::now(),
        })
    }

    /// Re-evaluate a held stop against the live price.
    ///
    /// Returns a new record; the input is never mutated. The stop only ever
    /// tightens: a candidate that would loosen it is discarded and the copy
    /// comes back unchanged with `update_reason` cleared.
    pub fn update_stop_loss(
        &self,
        current: &AdaptiveStopLoss,
        market: &MarketData,
        current_price: f64,
        direction: Direction,
        regime: Option<RegimeType>,
    ) -> AdaptiveStopLoss {
        let distance = current.percentile_based.value;
        let mut next = current.clone();
        next.update_reason = None;

        let candidate = match regime {
            Some(RegimeType::Momentum) => {
                let trail = distance * MOMENTUM_TRAIL_FRACTION;
                let stop = match direction {
                    Direction::Long => current_price - trail,
                    Direction::Short => current_price + trail,
                };
                Some((stop, "momentum trail"))
            }
            Some(RegimeType::MeanReversion) => {
                let step = distance * MEAN_REVERSION_RANGE_FRACTION * MEAN_REVERSION_STEP_FRACTION;
                let stop = match direction {
                    Direction::Long => current.initial_stop + step,
                    Direction::Short => current.initial_stop - step,
                };
                Some((stop, "mean-reversion tighten"))
            }
            _ => None,
        };

        if let Some((stop, reason)) = candidate {
            let tightens = match direction {
                Direction::Long => stop > current.current_stop,
                Direction::Short => stop < current.current_stop,
            };
            if tightens {
                next.current_stop = stop;
                next.update_reason = Some(reason.to_string());
                next.timestamp = Utc::now();

                debug!(
                    instrument = %market.instrument,
                    direction = %direction,
                    old_stop = format!("{:.4}", current.current_stop),
                    new_stop = format!("{:.4}", stop),
                    reason,
                    "Stop loss tightened"
                );
            }
        }

        next
    }
}
