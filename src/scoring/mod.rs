// =============================================================================
// Instrument Scoring Module
// =============================================================================
//
// Composite scoring pipeline:
// - Five normalized factor computations (regime / risk / technical)
// - Weighted aggregation into a single [0, 1] score per instrument
// - Ranking, filtering and factor-contribution diagnostics

pub mod factors;
pub mod scorer;

pub use factors::{default_factors, FactorCategory, FactorKind, ResolvedFactor, ScoringFactor};
pub use scorer::{CompositeScore, FactorContribution, InstrumentScorer, ScorerConfig};
