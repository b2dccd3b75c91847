//! Error Types for Wallet Advisor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Native balance or holdings enumeration failed. Aborts the cycle.
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Price or metadata lookup failed for a single asset.
    #[error("Enrichment unavailable for {asset}: {reason}")]
    EnrichmentUnavailable { asset: String, reason: String },

    #[error("Enrichment for {asset} timed out after {timeout_ms}ms")]
    EnrichmentTimeout { asset: String, timeout_ms: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid preferences: {0}")]
    InvalidPreferences(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AdvisorError {
    pub fn enrichment(asset: impl Into<String>, reason: impl ToString) -> Self {
        Self::EnrichmentUnavailable {
            asset: asset.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts an aggregation cycle.
    ///
    /// Per-asset enrichment failures never do; they degrade the holding.
    pub const fn is_cycle_fatal(&self) -> bool {
        !matches!(
            self,
            Self::EnrichmentUnavailable { .. } | Self::EnrichmentTimeout { .. }
        )
    }

    /// Convert to the last-error string shown to the presentation layer
    pub fn user_message(&self) -> String {
        match self {
            Self::SourceUnavailable(_) | Self::Network(_) => {
                "Failed to fetch wallet balances".into()
            }
            Self::InvalidAddress(addr) => format!("'{addr}' is not a valid wallet address"),
            Self::InvalidPreferences(msg) => format!("Invalid preferences: {msg}"),
            Self::EnrichmentUnavailable { asset, .. } | Self::EnrichmentTimeout { asset, .. } => {
                format!("Price data unavailable for {asset}")
            }
            _ => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrichment_errors_are_not_fatal() {
        assert!(!AdvisorError::enrichment("mint", "404").is_cycle_fatal());
        assert!(
            !AdvisorError::EnrichmentTimeout {
                asset: "mint".into(),
                timeout_ms: 10,
            }
            .is_cycle_fatal()
        );
        assert!(AdvisorError::SourceUnavailable("rpc down".into()).is_cycle_fatal());
    }

    #[test]
    fn test_user_message() {
        let err = AdvisorError::SourceUnavailable("connection refused".into());
        assert_eq!(err.user_message(), "Failed to fetch wallet balances");
    }
}
