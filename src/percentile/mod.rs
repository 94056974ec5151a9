// =============================================================================
// Percentile Engine Module
// =============================================================================
//
// Historical percentile statistics over bar series:
// - Interpolated percentile + live price-percentile rank
// - Entry signals at statistical extremes (regime-adaptive thresholds)
// - Percentile-based stop-loss sizing and trailing

pub mod engine;
pub mod stop_loss;

pub use engine::{
    Direction, PercentileConfig, PercentileData, PercentileEngine, PercentileEntry,
    PercentileStats,
};
pub use stop_loss::AdaptiveStopLoss;
