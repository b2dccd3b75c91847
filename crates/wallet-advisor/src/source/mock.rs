//! Mock Sources
//!
//! In-memory ledger and price service for testing and demo mode.
//! Failures and latency can be injected per address or per asset.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{LedgerClient, PriceService};
use crate::error::{AdvisorError, Result};
use crate::model::{RawHolding, TokenMetadata, TokenQuote};

/// Wallet used by the demo data set
pub const DEMO_ADDRESS: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
const BONK_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
const JUP_MINT: &str = "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN";

#[derive(Clone, Debug)]
struct Wallet {
    lamports: u64,
    holdings: Vec<RawHolding>,
}

/// Mock ledger with static wallets
#[derive(Default)]
pub struct MockLedger {
    wallets: HashMap<String, Wallet>,
    failing: AtomicBool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger preloaded with [`DEMO_ADDRESS`]
    pub fn demo() -> Self {
        Self::new().with_wallet(
            DEMO_ADDRESS,
            12_500_000_000,
            vec![
                RawHolding::new(USDC_MINT, 850_000_000, 6),
                RawHolding::new(BONK_MINT, 4_200_000_000_000, 5),
                RawHolding::new(JUP_MINT, 310_000_000, 6),
            ],
        )
    }

    #[must_use]
    pub fn with_wallet(
        mut self,
        address: impl Into<String>,
        lamports: u64,
        holdings: Vec<RawHolding>,
    ) -> Self {
        self.wallets.insert(address.into(), Wallet { lamports, holdings });
        self
    }

    /// Make every call fail with `SourceUnavailable`
    #[must_use]
    pub fn failing(self) -> Self {
        self.set_failing(true);
        self
    }

    /// Toggle failure mode on a shared ledger
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Add latency to every call
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `native_balance` calls served
    pub fn balance_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn wallet(&self, address: &str) -> Result<Wallet> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AdvisorError::SourceUnavailable("mock ledger offline".into()));
        }
        // Unknown addresses are empty wallets, as on chain
        Ok(self.wallets.get(address).cloned().unwrap_or(Wallet {
            lamports: 0,
            holdings: Vec::new(),
        }))
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn native_balance(&self, address: &str) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.wallet(address).await?.lamports)
    }

    async fn token_holdings(&self, address: &str) -> Result<Vec<RawHolding>> {
        Ok(self.wallet(address).await?.holdings)
    }

    fn name(&self) -> &str {
        "MockLedger"
    }
}

/// Mock price service with static quotes
pub struct MockPriceService {
    native_price: Option<Decimal>,
    quotes: HashMap<String, TokenQuote>,
    metadata: HashMap<String, TokenMetadata>,
    slow: HashMap<String, Duration>,
    failing: HashSet<String>,
}

impl Default for MockPriceService {
    fn default() -> Self {
        Self::new(dec!(150))
    }
}

impl MockPriceService {
    pub fn new(native_price: Decimal) -> Self {
        Self {
            native_price: Some(native_price),
            quotes: HashMap::new(),
            metadata: HashMap::new(),
            slow: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    /// Quotes and metadata for the demo wallet's tokens
    pub fn demo() -> Self {
        let usdc = TokenQuote::new(dec!(1.00), Some(dec!(0.01)));
        let bonk = TokenQuote::new(dec!(0.000021), Some(dec!(-12.4)));
        let jup = TokenQuote::new(dec!(0.84), Some(dec!(3.2)));

        Self::new(dec!(182.40))
            .with_token(USDC_MINT, "USDC", "USD Coin", usdc)
            .with_token(BONK_MINT, "BONK", "Bonk", bonk)
            .with_token(JUP_MINT, "JUP", "Jupiter", jup)
    }

    #[must_use]
    pub fn with_quote(mut self, asset_id: impl Into<String>, quote: TokenQuote) -> Self {
        self.quotes.insert(asset_id.into(), quote);
        self
    }

    #[must_use]
    pub fn with_token(
        self,
        asset_id: &str,
        symbol: &str,
        name: &str,
        quote: TokenQuote,
    ) -> Self {
        let mut service = self.with_quote(asset_id, quote);
        service.metadata.insert(
            asset_id.into(),
            TokenMetadata {
                symbol: Some(symbol.into()),
                name: Some(name.into()),
                icon: None,
            },
        );
        service
    }

    /// Make every lookup for this asset fail
    #[must_use]
    pub fn with_failure(mut self, asset_id: impl Into<String>) -> Self {
        self.failing.insert(asset_id.into());
        self
    }

    /// Delay every lookup for this asset
    #[must_use]
    pub fn with_slow_asset(mut self, asset_id: impl Into<String>, delay: Duration) -> Self {
        self.slow.insert(asset_id.into(), delay);
        self
    }

    /// Make the native price lookup fail
    #[must_use]
    pub const fn without_native_price(mut self) -> Self {
        self.native_price = None;
        self
    }

    async fn guard(&self, asset_id: &str) -> Result<()> {
        if let Some(delay) = self.slow.get(asset_id) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(asset_id) {
            return Err(AdvisorError::enrichment(asset_id, "mock failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl PriceService for MockPriceService {
    async fn token_quote(&self, asset_id: &str) -> Result<TokenQuote> {
        self.guard(asset_id).await?;
        self.quotes
            .get(asset_id)
            .cloned()
            .ok_or_else(|| AdvisorError::enrichment(asset_id, "no quote"))
    }

    async fn native_price(&self) -> Result<Decimal> {
        self.native_price
            .ok_or_else(|| AdvisorError::enrichment("native", "mock failure"))
    }

    async fn token_metadata(&self, asset_id: &str) -> Result<Option<TokenMetadata>> {
        self.guard(asset_id).await?;
        Ok(self.metadata.get(asset_id).cloned())
    }

    fn name(&self) -> &str {
        "MockPriceService"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_ledger() {
        let ledger = MockLedger::demo();

        let lamports = ledger.native_balance(DEMO_ADDRESS).await.unwrap();
        assert_eq!(lamports, 12_500_000_000);
        assert_eq!(ledger.token_holdings(DEMO_ADDRESS).await.unwrap().len(), 3);
        assert_eq!(ledger.balance_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_wallet_is_empty() {
        let ledger = MockLedger::demo();
        assert_eq!(ledger.native_balance("other").await.unwrap(), 0);
        assert!(ledger.token_holdings("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_ledger() {
        let ledger = MockLedger::demo().failing();
        let err = ledger.native_balance(DEMO_ADDRESS).await.unwrap_err();
        assert!(matches!(err, AdvisorError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_mock_prices() {
        let prices = MockPriceService::demo().with_failure(JUP_MINT);

        let usdc = prices.token_quote(USDC_MINT).await.unwrap();
        assert_eq!(usdc.usd, dec!(1.00));
        assert!(prices.token_quote(JUP_MINT).await.is_err());
        assert!(prices.token_quote("NOTREAL").await.is_err());

        let meta = prices.token_metadata(BONK_MINT).await.unwrap().unwrap();
        assert_eq!(meta.symbol.as_deref(), Some("BONK"));
    }
}
