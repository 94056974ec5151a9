// =============================================================================
// Error taxonomy
// =============================================================================
//
// Every failure here is an invalid-argument case: the call aborts with a
// descriptive message and no state changes. Degenerate-but-legitimate inputs
// (e.g. no momentum timeframes when scoring momentum strength) are not
// errors; they resolve to defined fallback values instead.

use thiserror::Error;

use crate::market_data::Timeframe;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantError {
    #[error("empty input series for {context}")]
    EmptySeries { context: &'static str },

    #[error("percentile {value} outside the valid range [0, 100]")]
    PercentileOutOfRange { value: f64 },

    #[error("insufficient {timeframe} bars: have {have}, need at least {need}")]
    InsufficientBars {
        timeframe: Timeframe,
        have: usize,
        need: usize,
    },
}

pub type Result<T> = std::result::Result<T, QuantError>;
