// =============================================================================
// Expectancy calculator collaborator types
// =============================================================================

use serde::{Deserialize, Serialize};

/// Risk-adjusted expectancy snapshot produced by the upstream expectancy
/// calculator. `final_expectancy` is the base expectancy after volatility and
/// regime adjustments; its working domain is roughly [-2.0, +2.0].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAdjustedExpectancy {
    pub base_expectancy: f64,
    /// Volatility adjustment applied upstream, roughly [-0.5, +0.5].
    /// Negative means volatility reduced the expectancy.
    pub volatility_adjustment: f64,
    pub final_expectancy: f64,
    /// Calculator confidence [0.0, 1.0].
    pub confidence: f64,
}
