// =============================================================================
// Regime classifier collaborator types
// =============================================================================
//
// The multi-timeframe regime classifier lives outside this crate; these are
// the shapes of the snapshots it hands us. `coherence` measures agreement
// across the per-timeframe classifications [0.0, 1.0].

use serde::{Deserialize, Serialize};

use crate::market_data::Timeframe;

/// Classified market behavior mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegimeType {
    /// Persistent directional move.
    Momentum,
    /// Oscillation around a fair value.
    MeanReversion,
    /// Regime change in progress — unstable classification.
    Transition,
    /// No dominant behavior.
    Neutral,
}

impl std::fmt::Display for RegimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Momentum => write!(f, "MOMENTUM"),
            Self::MeanReversion => write!(f, "MEAN_REVERSION"),
            Self::Transition => write!(f, "TRANSITION"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Regime classification for a single timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeRegime {
    pub timeframe: Timeframe,
    pub regime: RegimeType,
    /// Signed strength of the classified behavior (positive = bullish).
    pub strength: f64,
    /// Classifier confidence [0.0, 1.0].
    pub confidence: f64,
}

/// Aggregated classification across all tracked timeframes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiTimeframeRegime {
    pub dominant: RegimeType,
    /// Cross-timeframe agreement score [0.0, 1.0].
    pub coherence: f64,
    pub timeframes: Vec<TimeframeRegime>,
}

impl MultiTimeframeRegime {
    /// The per-timeframe entry for `timeframe`, when the classifier produced one.
    pub fn timeframe_entry(&self, timeframe: Timeframe) -> Option<&TimeframeRegime> {
        self.timeframes.iter().find(|t| t.timeframe == timeframe)
    }
}
