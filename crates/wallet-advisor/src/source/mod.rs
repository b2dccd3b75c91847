//! External Sources
//!
//! Abstractions over the ledger RPC and the market price service, with
//! network and in-memory implementations.

mod coingecko;
mod mock;
mod solana_rpc;

pub use coingecko::CoinGeckoClient;
pub use mock::{DEMO_ADDRESS, MockLedger, MockPriceService};
pub use solana_rpc::SolanaRpcClient;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::model::{RawHolding, TokenMetadata, TokenQuote};

/// Ledger client trait (Strategy pattern)
///
/// Both calls are mandatory for an aggregation cycle; failures should be
/// reported as `AdvisorError::SourceUnavailable`.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Native balance in lamports
    async fn native_balance(&self, address: &str) -> Result<u64>;

    /// Fungible token accounts owned by the address
    async fn token_holdings(&self, address: &str) -> Result<Vec<RawHolding>>;

    fn name(&self) -> &str;
}

/// Price service trait (Strategy pattern)
///
/// Failures are per asset and never abort a cycle.
#[async_trait]
pub trait PriceService: Send + Sync {
    /// Spot price and 24h change for a token mint
    async fn token_quote(&self, asset_id: &str) -> Result<TokenQuote>;

    /// Reference price of the native asset in USD
    async fn native_price(&self) -> Result<Decimal>;

    /// Symbol, name and icon for a token mint
    async fn token_metadata(&self, _asset_id: &str) -> Result<Option<TokenMetadata>> {
        Ok(None)
    }

    fn name(&self) -> &str;
}
