// =============================================================================
// Scoring Factors — normalized factor values per instrument
// =============================================================================
//
// Each factor maps one upstream input (regime, expectancy or raw bars) onto
// [0, 1]. Degenerate inputs — no momentum timeframes, too few bars for a
// percentile rank — resolve to 0 rather than failing: they are legitimate
// "no signal" states.

use serde::{Deserialize, Serialize};

use crate::expectancy::RiskAdjustedExpectancy;
use crate::market_data::MarketData;
use crate::regime::{MultiTimeframeRegime, RegimeType};

/// Bars considered by the percentile-extreme factor.
pub(crate) const EXTREME_LOOKBACK: usize = 100;

/// The closed set of factors the scorer can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorKind {
    RegimeAlignment,
    RiskAdjustedExpectancy,
    PercentileExtreme,
    MomentumStrength,
    VolatilityFavorability,
}

impl std::fmt::Display for FactorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegimeAlignment => write!(f, "regime_alignment"),
            Self::RiskAdjustedExpectancy => write!(f, "risk_adjusted_expectancy"),
            Self::PercentileExtreme => write!(f, "percentile_extreme"),
            Self::MomentumStrength => write!(f, "momentum_strength"),
            Self::VolatilityFavorability => write!(f, "volatility_favorability"),
        }
    }
}

/// Broad origin of a factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorCategory {
    Regime,
    Risk,
    Technical,
}

/// A configured factor: which computation to run and how much it weighs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringFactor {
    pub kind: FactorKind,
    pub weight: f64,
    pub category: FactorCategory,
}

/// A factor with its value resolved at scoring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedFactor {
    pub kind: FactorKind,
    pub value: f64,
    pub weight: f64,
    pub category: FactorCategory,
}

/// The default five-factor set. Weights sum to 1.0 by convention; the sum is
/// not enforced at runtime.
pub fn default_factors() -> Vec<ScoringFactor> {
    vec![
        ScoringFactor {
            kind: FactorKind::RegimeAlignment,
            weight: 0.25,
            category: FactorCategory::Regime,
        },
        ScoringFactor {
            kind: FactorKind::RiskAdjustedExpectancy,
            weight: 0.25,
            category: FactorCategory::Risk,
        },
        ScoringFactor {
            kind: FactorKind::PercentileExtreme,
            weight: 0.20,
            category: FactorCategory::Technical,
        },
        ScoringFactor {
            kind: FactorKind::MomentumStrength,
            weight: 0.15,
            category: FactorCategory::Technical,
        },
        ScoringFactor {
            kind: FactorKind::VolatilityFavorability,
            weight: 0.15,
            category: FactorCategory::Risk,
        },
    ]
}

impl FactorKind {
    /// Resolve this factor's normalized value from the upstream inputs.
    pub(crate) fn resolve(
        self,
        market: &MarketData,
        regime: &MultiTimeframeRegime,
        expectancy: &RiskAdjustedExpectancy,
    ) -> f64 {
        match self {
            Self::RegimeAlignment => regime_alignment(regime),
            Self::RiskAdjustedExpectancy => risk_adjusted_expectancy(expectancy),
            Self::PercentileExtreme => percentile_extreme(market),
            Self::MomentumStrength => momentum_strength(regime),
            Self::VolatilityFavorability => volatility_favorability(expectancy),
        }
    }
}

/// Coherence plus a per-regime bonus, clamped to [0, 1].
fn regime_alignment(regime: &MultiTimeframeRegime) -> f64 {
    let bonus = match regime.dominant {
        RegimeType::Momentum => 0.2,
        RegimeType::MeanReversion => 0.1,
        RegimeType::Transition => -0.2,
        RegimeType::Neutral => 0.0,
    };
    (regime.coherence + bonus).clamp(0.0, 1.0)
}

/// Expectancy mapped from its ±2 working domain onto [0, 1], scaled by the
/// calculator's confidence.
fn risk_adjusted_expectancy(expectancy: &RiskAdjustedExpectancy) -> f64 {
    let mapped = ((expectancy.final_expectancy + 2.0) / 4.0).clamp(0.0, 1.0);
    mapped * expectancy.confidence
}

/// Distance of the live price's percentile rank from the median, normalized:
/// 0 at the 50th percentile, 1 at either extreme. Bars of every timeframe
/// count; fewer than 2 bars scores 0.
fn percentile_extreme(market: &MarketData) -> f64 {
    let closes: Vec<f64> = market.bars.iter().map(|b| b.close).collect();
    let start = closes.len().saturating_sub(EXTREME_LOOKBACK);
    match price_percentile_rank(&closes[start..], market.current_price) {
        Some(rank) => (rank - 50.0).abs() / 50.0,
        None => 0.0,
    }
}

/// Mean |strength| of the timeframes classified MOMENTUM, scaled by their
/// mean confidence. 0 when no timeframe is in momentum.
fn momentum_strength(regime: &MultiTimeframeRegime) -> f64 {
    let momentum: Vec<_> = regime
        .timeframes
        .iter()
        .filter(|t| t.regime == RegimeType::Momentum)
        .collect();
    if momentum.is_empty() {
        return 0.0;
    }
    let n = momentum.len() as f64;
    let avg_strength = momentum.iter().map(|t| t.strength.abs()).sum::<f64>() / n;
    let avg_confidence = momentum.iter().map(|t| t.confidence).sum::<f64>() / n;
    avg_strength * avg_confidence
}

/// Volatility adjustment mapped from its ±0.5 domain onto [0, 1], with lower
/// volatility scoring higher.
fn volatility_favorability(expectancy: &RiskAdjustedExpectancy) -> f64 {
    (0.5 - expectancy.volatility_adjustment).clamp(0.0, 1.0)
}

/// Strict-below percentile rank of `price` within `closes`, 0–100.
/// `None` with fewer than 2 observations.
pub(crate) fn price_percentile_rank(closes: &[f64], price: f64) -> Option<f64> {
    if closes.len() < 2 {
        return None;
    }
    let below = closes.iter().filter(|&&c| c < price).count();
    Some(below as f64 / closes.len() as f64 * 100.0)
}
