// =============================================================================
// Instrument Scorer — weighted composite ranking
// =============================================================================
//
// Aggregates the configured factors into one score per instrument and ranks
// instrument sets. Ranking is a stable descending sort: ties keep their
// original relative order, rank values are contiguous 1..n and rank 1 gets
// the highest percentile.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expectancy::RiskAdjustedExpectancy;
use crate::market_data::{MarketData, Timeframe};
use crate::regime::MultiTimeframeRegime;

use super::factors::{
    default_factors, price_percentile_rank, FactorKind, ResolvedFactor, ScoringFactor,
    EXTREME_LOOKBACK,
};

// =============================================================================
// Types
// =============================================================================

/// Composite score for one instrument. `rank` and `percentile` stay `None`
/// until [`InstrumentScorer::rank_instruments`] populates them; a raw score
/// from [`InstrumentScorer::calculate_score`] never carries them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeScore {
    pub instrument: String,
    pub total_score: f64,
    pub factors: Vec<ResolvedFactor>,
    pub timestamp: DateTime<Utc>,
    pub rank: Option<usize>,
    pub percentile: Option<f64>,
    pub timeframe_scores: Option<BTreeMap<Timeframe, f64>>,
}

/// The share of the total score one factor accounts for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorContribution {
    pub kind: FactorKind,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
    pub percentage: f64,
}

// =============================================================================
// Configuration
// =============================================================================

/// Scorer parameters. Immutable once the scorer is built; derive a new
/// scorer via [`InstrumentScorer::with_factor_weights`] or
/// [`InstrumentScorer::with_config`] to change them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub factors: Vec<ScoringFactor>,
    /// Minimum total score [`InstrumentScorer::filter_by_score`] keeps.
    pub min_score: f64,
    /// Clamp the weighted sum to [0, 1].
    pub normalize_scores: bool,
    /// Attach a per-timeframe score map to every composite score.
    pub include_timeframe_breakdown: bool,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            factors: default_factors(),
            min_score: 0.6,
            normalize_scores: true,
            include_timeframe_breakdown: true,
        }
    }
}

// =============================================================================
// InstrumentScorer
// =============================================================================

/// Stateless-per-call composite scorer. Holds only its configuration, so a
/// shared instance is safe to call from concurrent contexts.
#[derive(Debug, Clone, Default)]
pub struct InstrumentScorer {
    config: ScorerConfig,
}

impl InstrumentScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Derive a new scorer with a replaced configuration.
    pub fn with_config(&self, config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Derive a new scorer with the listed factor weights replaced. Factors
    /// not named keep their weight; weight-sum coherence is the caller's
    /// responsibility.
    pub fn with_factor_weights(&self, overrides: &[(FactorKind, f64)]) -> Self {
        let mut config = self.config.clone();
        for factor in &mut config.factors {
            if let Some((_, weight)) = overrides.iter().find(|(kind, _)| *kind == factor.kind) {
                factor.weight = *weight;
            }
        }
        Self { config }
    }

    /// Resolve every configured factor and fold the weighted values into one
    /// composite score for the instrument in `market`.
    pub fn calculate_score(
        &self,
        market: &MarketData,
        regime: &MultiTimeframeRegime,
        expectancy: &RiskAdjustedExpectancy,
        timeframes: &[Timeframe],
    ) -> CompositeScore {
        let mut resolved = Vec::with_capacity(self.config.factors.len());
        let mut total = 0.0;

        for factor in &self.config.factors {
            let value = factor.kind.resolve(market, regime, expectancy);
            total += value * factor.weight;
            resolved.push(ResolvedFactor {
                kind: factor.kind,
                value,
                weight: factor.weight,
                category: factor.category,
            });
        }

        if self.config.normalize_scores {
            total = total.clamp(0.0, 1.0);
        }

        let timeframe_scores = if self.config.include_timeframe_breakdown {
            Some(self.timeframe_breakdown(market, regime, timeframes))
        } else {
            None
        };

        debug!(
            instrument = %market.instrument,
            total_score = format!("{:.4}", total),
            dominant_regime = %regime.dominant,
            "Composite score calculated"
        );

        CompositeScore {
            instrument: market.instrument.clone(),
            total_score: total,
            factors: resolved,
            timestamp: Utc::now(),
            rank: None,
            percentile: None,
            timeframe_scores,
        }
    }

    /// Stable sort descending by total score, then assign `rank = index + 1`
    /// and `percentile = (n - index) / n * 100`. Rank 1 gets the highest
    /// percentile and ties keep their original relative order.
    pub fn rank_instruments(&self, mut scores: Vec<CompositeScore>) -> Vec<CompositeScore> {
        scores.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let n = scores.len();
        for (index, score) in scores.iter_mut().enumerate() {
            score.rank = Some(index + 1);
            score.percentile = Some((n - index) as f64 / n as f64 * 100.0);
        }
        scores
    }

    /// Keep the scores at or above the configured minimum.
    pub fn filter_by_score(&self, scores: &[CompositeScore]) -> Vec<CompositeScore> {
        scores
            .iter()
            .filter(|s| s.total_score >= self.config.min_score)
            .cloned()
            .collect()
    }

    /// Rank, then take the first `count` instruments (fewer when the input
    /// is shorter).
    pub fn top_instruments(
        &self,
        scores: Vec<CompositeScore>,
        count: usize,
    ) -> Vec<CompositeScore> {
        let mut ranked = self.rank_instruments(scores);
        ranked.truncate(count);
        ranked
    }

    /// Per-factor share of a composite score, for diagnostics. A zero total
    /// yields zero percentages rather than dividing by zero.
    pub fn analyze_factor_contributions(&self, score: &CompositeScore) -> Vec<FactorContribution> {
        score
            .factors
            .iter()
            .map(|f| {
                let contribution = f.value * f.weight;
                let percentage = if score.total_score == 0.0 {
                    0.0
                } else {
                    contribution / score.total_score * 100.0
                };
                FactorContribution {
                    kind: f.kind,
                    value: f.value,
                    weight: f.weight,
                    contribution,
                    percentage,
                }
            })
            .collect()
    }

    /// Per-timeframe sub-score: half percentile extremeness of that
    /// timeframe's bars, half regime conviction (|strength| × confidence)
    /// from its classifier entry; either half is 0 when unavailable.
    fn timeframe_breakdown(
        &self,
        market: &MarketData,
        regime: &MultiTimeframeRegime,
        timeframes: &[Timeframe],
    ) -> BTreeMap<Timeframe, f64> {
        let mut breakdown = BTreeMap::new();
        for &timeframe in timeframes {
            let closes: Vec<f64> = market.bars_for(timeframe).map(|b| b.close).collect();
            let start = closes.len().saturating_sub(EXTREME_LOOKBACK);
            let extreme = price_percentile_rank(&closes[start..], market.current_price)
                .map(|rank| (rank - 50.0).abs() / 50.0)
                .unwrap_or(0.0);
            let conviction = regime
                .timeframe_entry(timeframe)
                .map(|t| (t.strength.abs() * t.confidence).clamp(0.0, 1.0))
                .unwrap_or(0.0);
            breakdown.insert(timeframe, 0.5 * extreme + 0.5 * conviction);
        }
        breakdown
    }
}
