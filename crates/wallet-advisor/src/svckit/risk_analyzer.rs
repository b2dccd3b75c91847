//! Risk Analyzer
//!
//! Scores a portfolio snapshot on concentration, diversification and
//! volatility. Every score is clamped to [0, 100]; the analyzer is pure and
//! total.
//!
//! Volatility is approximated from the latest 24h change only - there is no
//! price history to compute variance from.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::RiskThresholds;
use crate::model::{PortfolioSnapshot, RiskMetrics, TokenHolding};

/// Computes [`RiskMetrics`] from a snapshot
#[derive(Clone, Debug, Default)]
pub struct RiskAnalyzer {
    thresholds: RiskThresholds,
}

impl RiskAnalyzer {
    pub const fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub const fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    pub fn analyze(&self, snapshot: &PortfolioSnapshot) -> RiskMetrics {
        let concentration_risk = self.concentration_risk(snapshot);
        let diversification_score = self.diversification_score(snapshot.asset_count());
        let volatility_score = self.volatility_score(snapshot.holdings());

        RiskMetrics {
            diversification_score,
            volatility_score,
            concentration_risk,
            overall_risk: (concentration_risk
                + (Decimal::ONE_HUNDRED - diversification_score)
                + volatility_score)
                / dec!(3),
        }
    }

    /// Largest single-asset share relative to the concentration threshold.
    /// Unpriced holdings never enter the numerator.
    pub fn concentration_risk(&self, snapshot: &PortfolioSnapshot) -> Decimal {
        let max_share = snapshot
            .valued_assets()
            .filter_map(|(_, value)| snapshot.share_of(value))
            .max()
            .unwrap_or(Decimal::ZERO);
        saturating_score(max_share, self.thresholds.concentration_threshold)
    }

    /// Saturates at the optimal asset count
    pub fn diversification_score(&self, asset_count: usize) -> Decimal {
        saturating_score(
            Decimal::from(asset_count),
            Decimal::from(self.thresholds.optimal_asset_count),
        )
    }

    /// Average absolute 24h change over holdings that report one
    pub fn volatility_score(&self, holdings: &[TokenHolding]) -> Decimal {
        let changes: Vec<Decimal> = holdings
            .iter()
            .filter_map(TokenHolding::change_24h_pct)
            .map(|c| c.abs())
            .collect();

        if changes.is_empty() {
            return Decimal::ZERO;
        }

        let Some(sum) = changes.iter().try_fold(Decimal::ZERO, |acc, c| acc.checked_add(*c))
        else {
            return Decimal::ONE_HUNDRED;
        };
        let avg = sum / Decimal::from(changes.len());
        saturating_score(avg, self.thresholds.volatility_baseline_pct)
    }
}

/// `min(100, value / baseline × 100)`, floored at 0. Overflow saturates.
fn saturating_score(value: Decimal, baseline: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if baseline <= Decimal::ZERO {
        return Decimal::ONE_HUNDRED;
    }
    value
        .checked_div(baseline)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ONE_HUNDRED, |score| score.min(Decimal::ONE_HUNDRED))
}
