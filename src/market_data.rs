// =============================================================================
// Market data input types
// =============================================================================
//
// Read-only snapshots supplied by the upstream feed. Bars are immutable once
// produced and ordered by time ascending within a timeframe; a single
// `MarketData` snapshot may mix timeframes freely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candle interval of a bar series.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::M1 => write!(f, "1m"),
            Self::M5 => write!(f, "5m"),
            Self::M15 => write!(f, "15m"),
            Self::M30 => write!(f, "30m"),
            Self::H1 => write!(f, "1h"),
            Self::H4 => write!(f, "4h"),
            Self::D1 => write!(f, "1d"),
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Self::M1),
            "5m" => Ok(Self::M5),
            "15m" => Ok(Self::M15),
            "30m" => Ok(Self::M30),
            "1h" => Ok(Self::H1),
            "4h" => Ok(Self::H4),
            "1d" => Ok(Self::D1),
            other => Err(format!("unknown timeframe: {other}")),
        }
    }
}

/// A single OHLCV bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timeframe: Timeframe,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-instrument market snapshot: the live price plus the bar history the
/// decision layer computes over. Passed by reference into every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    pub instrument: String,
    pub current_price: f64,
    pub bars: Vec<OhlcvBar>,
}

impl MarketData {
    /// Iterate over the bars belonging to a single timeframe, oldest first.
    pub fn bars_for(&self, timeframe: Timeframe) -> impl Iterator<Item = &OhlcvBar> {
        self.bars.iter().filter(move |b| b.timeframe == timeframe)
    }

    /// Closing prices for a timeframe, truncated to the trailing `lookback`
    /// values (all of them when fewer are available).
    pub fn trailing_closes(&self, timeframe: Timeframe, lookback: usize) -> Vec<f64> {
        let closes: Vec<f64> = self.bars_for(timeframe).map(|b| b.close).collect();
        let start = closes.len().saturating_sub(lookback);
        closes[start..].to_vec()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn bars_for_filters_by_timeframe() {
        let market = MarketData {
            instrument: "BTCUSDT".to_string(),
            current_price: 100.0,
            bars: vec![
                bar(Timeframe::H1, 100.0),
                bar(Timeframe::M5, 101.0),
                bar(Timeframe::H1, 102.0),
            ],
        };
        let h1: Vec<f64> = market.bars_for(Timeframe::H1).map(|b| b.close).collect();
        assert_eq!(h1, vec![100.0, 102.0]);
    }

    #[test]
    fn trailing_closes_truncates_to_lookback() {
        let market = MarketData {
            instrument: "BTCUSDT".to_string(),
            current_price: 100.0,
            bars: (0..10).map(|i| bar(Timeframe::H1, 100.0 + i as f64)).collect(),
        };
        let closes = market.trailing_closes(Timeframe::H1, 3);
        assert_eq!(closes, vec![107.0, 108.0, 109.0]);

        // Lookback larger than the series returns everything.
        assert_eq!(market.trailing_closes(Timeframe::H1, 50).len(), 10);
    }

    #[test]
    fn timeframe_display_roundtrip() {
        for tf in [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ] {
            let parsed: Timeframe = tf.to_string().parse().unwrap();
            assert_eq!(parsed, tf);
        }
        assert!("7m".parse::<Timeframe>().is_err());
    }
}
