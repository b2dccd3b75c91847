//! Recommendation Engine
//!
//! Evaluates an ordered table of rules against a snapshot. Each rule is
//! independent; output order is rule order, then holding order within a rule.
//! An empty result means no action is needed.

use rust_decimal_macros::dec;

use crate::config::RiskThresholds;
use crate::model::{
    AssetRef, NATIVE_SYMBOL, PortfolioSnapshot, Priority, Recommendation, RecommendationKind,
};

/// A single recommendation rule (Strategy pattern)
///
/// Implement this and append it with [`RecommendationEngine::with_rule`] to
/// extend the table without touching existing rules.
pub trait RecommendationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        snapshot: &PortfolioSnapshot,
        thresholds: &RiskThresholds,
        out: &mut Vec<Recommendation>,
    );
}

/// Native asset holds more than the trigger share of total value
pub struct NativeConcentrationRule;

impl RecommendationRule for NativeConcentrationRule {
    fn name(&self) -> &'static str {
        "native_concentration"
    }

    fn evaluate(
        &self,
        snapshot: &PortfolioSnapshot,
        thresholds: &RiskThresholds,
        out: &mut Vec<Recommendation>,
    ) {
        let Some(share) = snapshot.native_share() else {
            return;
        };
        if share > thresholds.native_concentration_trigger {
            out.push(Recommendation {
                kind: RecommendationKind::Sell,
                asset: AssetRef::Native,
                asset_label: NATIVE_SYMBOL.into(),
                confidence: dec!(0.8),
                rationale: format!(
                    "High concentration in {NATIVE_SYMBOL}. \
                     Consider diversifying into other assets."
                ),
                priority: Priority::High,
            });
        }
    }
}

/// Holding fell further than the decline trigger in the last 24 hours
pub struct SharpDeclineRule;

impl RecommendationRule for SharpDeclineRule {
    fn name(&self) -> &'static str {
        "sharp_decline"
    }

    fn evaluate(
        &self,
        snapshot: &PortfolioSnapshot,
        thresholds: &RiskThresholds,
        out: &mut Vec<Recommendation>,
    ) {
        for holding in snapshot.holdings() {
            let Some(change) = holding.change_24h_pct() else {
                continue;
            };
            if change < thresholds.sharp_decline_pct {
                out.push(Recommendation {
                    kind: RecommendationKind::Sell,
                    asset: AssetRef::Token(holding.asset_id().to_string()),
                    asset_label: holding.label().to_string(),
                    confidence: dec!(0.7),
                    rationale: "Significant price decline in the last 24 hours.".into(),
                    priority: Priority::Medium,
                });
            }
        }
    }
}

/// Runs the rule table over a snapshot
pub struct RecommendationEngine {
    thresholds: RiskThresholds,
    rules: Vec<Box<dyn RecommendationRule>>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(RiskThresholds::default())
    }
}

impl RecommendationEngine {
    /// Engine with the built-in rules
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self::empty(thresholds)
            .with_rule(NativeConcentrationRule)
            .with_rule(SharpDeclineRule)
    }

    /// Engine with no rules
    pub fn empty(thresholds: RiskThresholds) -> Self {
        Self {
            thresholds,
            rules: Vec::new(),
        }
    }

    /// Append a rule; it is evaluated after all existing rules
    #[must_use]
    pub fn with_rule<R: RecommendationRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn recommend(&self, snapshot: &PortfolioSnapshot) -> Vec<Recommendation> {
        let mut out = Vec::new();
        for rule in &self.rules {
            rule.evaluate(snapshot, &self.thresholds, &mut out);
        }
        out
    }
}
