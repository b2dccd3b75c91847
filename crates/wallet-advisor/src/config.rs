//! Configuration
//!
//! Service endpoints and timing come from the environment; analysis
//! thresholds are named constants gathered in [`RiskThresholds`].

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
pub const DEFAULT_PRICE_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Share of the portfolio above which a single asset is over-concentrated
pub const CONCENTRATION_THRESHOLD: Decimal = dec!(0.30);

/// Average absolute 24h move (percent) that saturates the volatility score
pub const VOLATILITY_BASELINE_PCT: Decimal = dec!(10);

/// Asset count at which diversification saturates
pub const OPTIMAL_ASSET_COUNT: u32 = 10;

/// Native share above which a diversify recommendation is emitted
pub const NATIVE_CONCENTRATION_TRIGGER: Decimal = dec!(0.5);

/// 24h change (percent) below which a holding is flagged as declining
pub const SHARP_DECLINE_PCT: Decimal = dec!(-10);

/// Runtime configuration for sources and the refresh loop
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Solana JSON-RPC endpoint
    pub rpc_url: String,

    /// Price service base URL
    pub price_api_url: String,

    /// Period between refresh cycles
    pub refresh_interval: Duration,

    /// Upper bound on any single enrichment call
    pub enrichment_timeout: Duration,

    /// Serve from in-memory sources instead of the network
    pub use_mock_sources: bool,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            price_api_url: DEFAULT_PRICE_API_URL.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            enrichment_timeout: DEFAULT_ENRICHMENT_TIMEOUT,
            use_mock_sources: false,
        }
    }
}

impl AdvisorConfig {
    /// Build from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let refresh_interval = match std::env::var("REFRESH_INTERVAL_SECS") {
            Ok(v) => Duration::from_secs(parse_positive("REFRESH_INTERVAL_SECS", &v)?),
            Err(_) => defaults.refresh_interval,
        };
        let enrichment_timeout = match std::env::var("ENRICHMENT_TIMEOUT_MS") {
            Ok(v) => Duration::from_millis(parse_positive("ENRICHMENT_TIMEOUT_MS", &v)?),
            Err(_) => defaults.enrichment_timeout,
        };

        Ok(Self {
            rpc_url: std::env::var("SOLANA_RPC_URL").unwrap_or(defaults.rpc_url),
            price_api_url: std::env::var("PRICE_API_URL").unwrap_or(defaults.price_api_url),
            refresh_interval,
            enrichment_timeout,
            use_mock_sources: std::env::var("USE_MOCK_SOURCES")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AdvisorError::Config(format!(
            "{key} must be a positive integer, got '{value}'"
        ))),
    }
}

/// Thresholds used by the risk analyzer and recommendation engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub concentration_threshold: Decimal,
    pub volatility_baseline_pct: Decimal,
    pub optimal_asset_count: u32,
    pub native_concentration_trigger: Decimal,
    pub sharp_decline_pct: Decimal,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            concentration_threshold: CONCENTRATION_THRESHOLD,
            volatility_baseline_pct: VOLATILITY_BASELINE_PCT,
            optimal_asset_count: OPTIMAL_ASSET_COUNT,
            native_concentration_trigger: NATIVE_CONCENTRATION_TRIGGER,
            sharp_decline_pct: SHARP_DECLINE_PCT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert!(!config.use_mock_sources);

        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.concentration_threshold, dec!(0.3));
        assert_eq!(thresholds.optimal_asset_count, 10);
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("X", " 15 ").unwrap(), 15);
        assert!(parse_positive("X", "0").is_err());
        assert!(parse_positive("X", "soon").is_err());
    }
}
