//! Service Kit
//!
//! The analysis pipeline: aggregation, risk scoring, recommendations, and
//! the monitor that runs them on a timer.

mod balance_aggregator;
mod portfolio_monitor;
mod recommendation;
mod risk_analyzer;

pub use balance_aggregator::{BalanceAggregator, validate_address};
pub use portfolio_monitor::{
    MonitorHandle, PortfolioMonitor, PortfolioView, RefreshOutcome, SnapshotSlot,
};
pub use recommendation::{
    NativeConcentrationRule, RecommendationEngine, RecommendationRule, SharpDeclineRule,
};
pub use risk_analyzer::RiskAnalyzer;
