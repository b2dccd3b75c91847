//! Balance Aggregator
//!
//! Builds a [`PortfolioSnapshot`] for an address: native balance and token
//! accounts from the ledger, each token enriched with price, 24h change and
//! metadata from the price service.
//!
//! ```text
//!   native_balance ─┐
//!   token_holdings ─┼─► merge mints ─► enrich × N (timeout each) ─┐
//!                   │                                              ├─► assemble
//!   native_price ───┴──────────────────────────────────────────────┘
//! ```
//!
//! Only the two ledger calls are mandatory. Enrichment failures and
//! timeouts degrade a single holding to unpriced.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;

use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Result};
use crate::model::{PortfolioSnapshot, RawHolding, TokenHolding};
use crate::source::{LedgerClient, PriceService};

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Aggregates balances and market data into portfolio snapshots
pub struct BalanceAggregator {
    ledger: Arc<dyn LedgerClient>,
    prices: Arc<dyn PriceService>,
    enrichment_timeout: Duration,
}

impl BalanceAggregator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        prices: Arc<dyn PriceService>,
        enrichment_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            prices,
            enrichment_timeout,
        }
    }

    pub fn from_config(
        ledger: Arc<dyn LedgerClient>,
        prices: Arc<dyn PriceService>,
        config: &AdvisorConfig,
    ) -> Self {
        Self::new(ledger, prices, config.enrichment_timeout)
    }

    /// Build a fresh snapshot for `address`.
    ///
    /// Fails only if the address is invalid or a mandatory ledger call fails.
    pub async fn aggregate(&self, address: &str) -> Result<PortfolioSnapshot> {
        let address = validate_address(address)?;

        let ledger = async {
            let (lamports, raw) = tokio::join!(
                self.ledger.native_balance(address),
                self.ledger.token_holdings(address),
            );
            let lamports = lamports.map_err(into_source_error)?;
            let raw = raw.map_err(into_source_error)?;
            Ok::<_, AdvisorError>((lamports, self.enrich_all(merge_by_mint(raw)).await))
        };

        let (ledger, native_price) = tokio::join!(ledger, self.native_price());
        let (lamports, holdings) = ledger?;

        let snapshot = PortfolioSnapshot::from_lamports(address, lamports, native_price, holdings);
        tracing::debug!(
            "Aggregated {} via {}/{}: {} holdings ({} unpriced), total ${:.2}",
            address,
            self.ledger.name(),
            self.prices.name(),
            snapshot.holdings().len(),
            snapshot.unpriced_count(),
            snapshot.total_value()
        );
        Ok(snapshot)
    }

    async fn native_price(&self) -> Option<Decimal> {
        match self.bounded("native", self.prices.native_price()).await {
            Ok(price) => Some(price),
            Err(e) => {
                tracing::warn!("Native price unavailable, valuing native balance at 0: {}", e);
                None
            }
        }
    }

    async fn enrich_all(&self, raw: Vec<RawHolding>) -> Vec<TokenHolding> {
        join_all(raw.into_iter().map(|r| self.enrich(r))).await
    }

    /// Price and metadata lookups run concurrently; each failure only
    /// drops its own part of the enrichment.
    async fn enrich(&self, raw: RawHolding) -> TokenHolding {
        let (quote, metadata) = tokio::join!(
            self.bounded(&raw.mint, self.prices.token_quote(&raw.mint)),
            self.bounded(&raw.mint, self.prices.token_metadata(&raw.mint)),
        );

        let mut holding = TokenHolding::new(raw);
        match quote {
            Ok(quote) => holding = holding.with_quote(quote),
            Err(e) => tracing::debug!("Holding left unpriced: {}", e),
        }
        match metadata {
            Ok(Some(meta)) => holding = holding.with_metadata(meta),
            Ok(None) => {}
            Err(e) => tracing::debug!("Holding left without metadata: {}", e),
        }
        holding
    }

    async fn bounded<T>(&self, asset: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.enrichment_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(AdvisorError::EnrichmentTimeout {
                    asset: asset.to_string(),
                    timeout_ms: u64::try_from(self.enrichment_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                })
            })
    }
}

fn into_source_error(err: AdvisorError) -> AdvisorError {
    match err {
        AdvisorError::SourceUnavailable(_) => err,
        other => AdvisorError::SourceUnavailable(other.to_string()),
    }
}

/// Check that `address` looks like a base58 public key
pub fn validate_address(address: &str) -> Result<&str> {
    let trimmed = address.trim();
    let valid = (32..=44).contains(&trimmed.len())
        && trimmed.chars().all(|c| BASE58_ALPHABET.contains(c));
    if valid {
        Ok(trimmed)
    } else {
        Err(AdvisorError::InvalidAddress(address.to_string()))
    }
}

/// Collapse multiple token accounts of the same mint into one holding,
/// keeping first-seen order.
fn merge_by_mint(raw: Vec<RawHolding>) -> Vec<RawHolding> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<RawHolding> = Vec::with_capacity(raw.len());

    for holding in raw {
        if let Some(&i) = index.get(&holding.mint) {
            merged[i].raw_amount = merged[i].raw_amount.saturating_add(holding.raw_amount);
        } else {
            index.insert(holding.mint.clone(), merged.len());
            merged.push(holding);
        }
    }
    merged
}
