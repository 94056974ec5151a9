// =============================================================================
// quant-core — quantitative decision layer
// =============================================================================
//
// The decision core of a trading framework, composed by an external
// orchestrator that owns the trading loop:
//
// - [`PercentileEngine`] — percentile statistics over bar history, entry
//   signals at statistical extremes, adaptive stop-loss sizing and trailing.
// - [`InstrumentScorer`] — regime/risk/technical factors aggregated into one
//   weighted score per instrument, with ranking and filtering.
//
// Both components are pure functions over their inputs plus an immutable
// per-instance configuration: no I/O, no interior mutability, every call
// synchronous and reentrant. Market data, regime classifications and
// expectancy snapshots come from upstream collaborators; entry signals,
// stop records and ranked scores go to the orchestrator downstream.

pub mod error;
pub mod expectancy;
pub mod indicators;
pub mod market_data;
pub mod percentile;
pub mod regime;
pub mod scoring;

pub use error::{QuantError, Result};
pub use expectancy::RiskAdjustedExpectancy;
pub use market_data::{MarketData, OhlcvBar, Timeframe};
pub use percentile::{
    AdaptiveStopLoss, Direction, PercentileConfig, PercentileData, PercentileEngine,
    PercentileEntry, PercentileStats,
};
pub use regime::{MultiTimeframeRegime, RegimeType, TimeframeRegime};
pub use scoring::{
    CompositeScore, FactorCategory, FactorContribution, FactorKind, InstrumentScorer,
    ResolvedFactor, ScorerConfig, ScoringFactor,
};
