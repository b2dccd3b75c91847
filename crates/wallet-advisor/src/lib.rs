//! # wallet-advisor
//!
//! Portfolio analysis for a single wallet: balance aggregation, risk
//! scoring, and rule-based recommendations.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────────┐   PortfolioSnapshot
//! │ LedgerClient │──►│                     │──────────┬───────────────────┐
//! └──────────────┘   │  BalanceAggregator  │          ▼                   ▼
//! ┌──────────────┐   │  (fan-out enrich,   │   ┌──────────────┐  ┌──────────────────────┐
//! │ PriceService │──►│   per-call timeout) │   │ RiskAnalyzer │  │ RecommendationEngine │
//! └──────────────┘   └─────────────────────┘   └──────────────┘  └──────────────────────┘
//!                              ▲                      │ RiskMetrics        │ Vec<Recommendation>
//!                              │                      ▼                    ▼
//!                    PortfolioMonitor ──────────► SnapshotSlot (versioned, replace-only)
//!                    (timer, in-flight guard)
//! ```
//!
//! ## Scores
//!
//! - **Concentration** - largest single-asset share against a 30% threshold
//! - **Diversification** - distinct assets against a baseline of 10
//! - **Volatility** - average absolute 24h move against a 10% baseline
//! - **Overall** - mean of concentration, inverse diversification and volatility
//!
//! All scores live in [0, 100]. Thresholds are collected in
//! [`RiskThresholds`] so they can be swapped per user later.

pub mod config;
pub mod error;
pub mod model;
pub mod preferences;
pub mod source;
pub mod svckit;

pub use config::{AdvisorConfig, RiskThresholds};
pub use error::{AdvisorError, Result};
pub use model::{
    AssetRef, PortfolioSnapshot, Priority, RawHolding, Recommendation, RecommendationKind,
    RiskMetrics, TokenHolding, TokenMetadata, TokenQuote,
};
pub use preferences::{InvestmentPreferences, PreferencesStore, PreferencesUpdate};
pub use svckit::{
    BalanceAggregator, MonitorHandle, PortfolioMonitor, PortfolioView, RecommendationEngine,
    RefreshOutcome, RiskAnalyzer, SnapshotSlot,
};
