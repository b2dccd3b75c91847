//! Domain Models
//!
//! Core data types for wallet portfolio analysis.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!
//!
//! Derived fields (`display_amount`, `value`, `total_value`) are computed at
//! construction and cannot be set directly, so a snapshot is always
//! internally consistent.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest scale `Decimal` can represent.
const MAX_SCALE: u8 = 28;

/// Decimals of the native asset (lamports per SOL = 10^9).
pub const NATIVE_DECIMALS: u8 = 9;

/// Ticker shown for the native asset.
pub const NATIVE_SYMBOL: &str = "SOL";

/// Convert a raw smallest-unit amount into display units.
pub fn display_amount(raw: u64, decimals: u8) -> Decimal {
    let scale = decimals.min(MAX_SCALE);
    let mut amount = Decimal::from_i128_with_scale(i128::from(raw), u32::from(scale));
    for _ in scale..decimals {
        amount /= Decimal::TEN;
    }
    amount
}

/// Subject of a recommendation or allocation entry
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AssetRef {
    /// The chain's base currency
    Native,
    /// A fungible token, identified by its mint
    Token(String),
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str(NATIVE_SYMBOL),
            Self::Token(mint) => f.write_str(mint),
        }
    }
}

/// A token account as reported by the ledger, before enrichment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHolding {
    /// Mint address
    pub mint: String,

    /// Amount in the smallest unit
    pub raw_amount: u64,

    pub decimals: u8,
}

impl RawHolding {
    pub fn new(mint: impl Into<String>, raw_amount: u64, decimals: u8) -> Self {
        Self {
            mint: mint.into(),
            raw_amount,
            decimals,
        }
    }
}

/// Spot price and 24h change for a token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenQuote {
    /// Price in USD
    pub usd: Decimal,

    /// 24-hour change percentage, if the service reports one
    pub usd_24h_change: Option<Decimal>,
}

impl TokenQuote {
    pub const fn new(usd: Decimal, usd_24h_change: Option<Decimal>) -> Self {
        Self { usd, usd_24h_change }
    }
}

/// Display metadata for a token
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
}

/// One holding of a fungible token, enriched with market data
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenHolding {
    asset_id: String,
    raw_amount: u64,
    decimals: u8,
    display_amount: Decimal,
    symbol: Option<String>,
    display_name: Option<String>,
    icon: Option<String>,
    unit_price: Option<Decimal>,
    value: Option<Decimal>,
    change_24h_pct: Option<Decimal>,
}

impl TokenHolding {
    /// Create an unpriced holding from a raw ledger entry
    pub fn new(raw: RawHolding) -> Self {
        Self {
            display_amount: display_amount(raw.raw_amount, raw.decimals),
            asset_id: raw.mint,
            raw_amount: raw.raw_amount,
            decimals: raw.decimals,
            symbol: None,
            display_name: None,
            icon: None,
            unit_price: None,
            value: None,
            change_24h_pct: None,
        }
    }

    /// Attach a price quote. Negative prices, and prices whose value
    /// overflows `Decimal`, are discarded.
    #[must_use]
    pub fn with_quote(mut self, quote: TokenQuote) -> Self {
        let value = (quote.usd >= Decimal::ZERO)
            .then(|| self.display_amount.checked_mul(quote.usd))
            .flatten();
        if let Some(value) = value {
            self.unit_price = Some(quote.usd);
            self.value = Some(value);
        }
        self.change_24h_pct = quote.usd_24h_change;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: TokenMetadata) -> Self {
        self.symbol = metadata.symbol.map(|s| s.to_uppercase());
        self.display_name = metadata.name;
        self.icon = metadata.icon;
        self
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub const fn raw_amount(&self) -> u64 {
        self.raw_amount
    }

    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    pub const fn display_amount(&self) -> Decimal {
        self.display_amount
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub const fn unit_price(&self) -> Option<Decimal> {
        self.unit_price
    }

    /// Value in USD; `None` when the price lookup failed
    pub const fn value(&self) -> Option<Decimal> {
        self.value
    }

    pub const fn change_24h_pct(&self) -> Option<Decimal> {
        self.change_24h_pct
    }

    pub const fn is_priced(&self) -> bool {
        self.unit_price.is_some()
    }

    /// Symbol if known, otherwise the mint
    pub fn label(&self) -> &str {
        self.symbol().unwrap_or(&self.asset_id)
    }
}

/// Immutable view of a wallet's balances at one point in time
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PortfolioSnapshot {
    address: String,
    native_balance: Decimal,
    native_price: Option<Decimal>,
    native_value: Decimal,
    holdings: Vec<TokenHolding>,
    total_value: Decimal,
    captured_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    /// Assemble a snapshot, computing every derived field.
    ///
    /// A missing, negative or overflowing native price zeroes the native
    /// contribution. A total beyond `Decimal::MAX` saturates.
    pub fn assemble(
        address: impl Into<String>,
        native_balance: Decimal,
        native_price: Option<Decimal>,
        holdings: Vec<TokenHolding>,
    ) -> Self {
        let native_balance = native_balance.max(Decimal::ZERO);
        let native_price = native_price
            .filter(|p| *p >= Decimal::ZERO && native_balance.checked_mul(*p).is_some());
        let native_value = native_price.map_or(Decimal::ZERO, |p| native_balance * p);
        let total_value = holdings
            .iter()
            .filter_map(TokenHolding::value)
            .try_fold(native_value, Decimal::checked_add)
            .unwrap_or(Decimal::MAX);

        Self {
            address: address.into(),
            native_balance,
            native_price,
            native_value,
            total_value,
            holdings,
            captured_at: Utc::now(),
        }
    }

    /// Assemble from a lamport balance
    pub fn from_lamports(
        address: impl Into<String>,
        lamports: u64,
        native_price: Option<Decimal>,
        holdings: Vec<TokenHolding>,
    ) -> Self {
        Self::assemble(
            address,
            display_amount(lamports, NATIVE_DECIMALS),
            native_price,
            holdings,
        )
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub const fn native_balance(&self) -> Decimal {
        self.native_balance
    }

    pub const fn native_price(&self) -> Option<Decimal> {
        self.native_price
    }

    pub const fn native_value(&self) -> Decimal {
        self.native_value
    }

    pub fn holdings(&self) -> &[TokenHolding] {
        &self.holdings
    }

    pub const fn total_value(&self) -> Decimal {
        self.total_value
    }

    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Distinct assets held: the native asset plus every token holding,
    /// priced or not
    pub fn asset_count(&self) -> usize {
        1 + self.holdings.len()
    }

    /// Holdings whose price lookup failed
    pub fn unpriced_count(&self) -> usize {
        self.holdings.iter().filter(|h| !h.is_priced()).count()
    }

    /// Fraction of total value held in `value`, or `None` for an empty portfolio
    pub fn share_of(&self, value: Decimal) -> Option<Decimal> {
        if self.total_value > Decimal::ZERO {
            Some(value / self.total_value)
        } else {
            None
        }
    }

    /// Fraction of total value held in the native asset
    pub fn native_share(&self) -> Option<Decimal> {
        self.share_of(self.native_value)
    }

    /// Valued entries: the native asset followed by each priced holding
    pub fn valued_assets(&self) -> impl Iterator<Item = (AssetRef, Decimal)> + '_ {
        std::iter::once((AssetRef::Native, self.native_value)).chain(
            self.holdings
                .iter()
                .filter_map(|h| h.value().map(|v| (AssetRef::Token(h.asset_id.clone()), v))),
        )
    }

    /// Allocation percentages by asset, largest first
    pub fn allocations(&self) -> Vec<(AssetRef, Decimal)> {
        let mut allocs: Vec<_> = self
            .valued_assets()
            .filter_map(|(asset, value)| {
                self.share_of(value)
                    .map(|share| (asset, share * Decimal::ONE_HUNDRED))
            })
            .collect();
        allocs.sort_by(|a, b| b.1.cmp(&a.1));
        allocs
    }
}

/// Portfolio risk scores, each in [0, 100]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub diversification_score: Decimal,
    pub volatility_score: Decimal,
    pub concentration_risk: Decimal,
    pub overall_risk: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecommendationKind {
    Buy,
    Sell,
    Hold,
    Swap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// An actionable suggestion produced by the recommendation engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,

    /// Subject asset
    pub asset: AssetRef,

    /// Symbol if known, otherwise the asset identifier
    pub asset_label: String,

    /// Confidence in [0, 1]
    pub confidence: Decimal,

    pub rationale: String,

    pub priority: Priority,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn priced(mint: &str, raw: u64, decimals: u8, price: Decimal) -> TokenHolding {
        TokenHolding::new(RawHolding::new(mint, raw, decimals))
            .with_quote(TokenQuote::new(price, None))
    }

    #[test]
    fn test_display_amount() {
        assert_eq!(display_amount(1_500_000, 6), dec!(1.5));
        assert_eq!(display_amount(42, 0), dec!(42));
        assert_eq!(display_amount(2_000_000_000, NATIVE_DECIMALS), dec!(2));
        assert!(display_amount(u64::MAX, 30) >= Decimal::ZERO);
    }

    #[test]
    fn test_holding_value() {
        let holding = priced("USDC", 25_000_000, 6, dec!(2));
        assert_eq!(holding.display_amount(), dec!(25));
        assert_eq!(holding.value(), Some(dec!(50)));
    }

    #[test]
    fn test_unpriced_holding_has_no_value() {
        let holding = TokenHolding::new(RawHolding::new("BONK", 100, 0));
        assert_eq!(holding.value(), None);
        assert_eq!(holding.unit_price(), None);
        assert_eq!(holding.label(), "BONK");
    }

    #[test]
    fn test_negative_price_is_discarded() {
        let holding = TokenHolding::new(RawHolding::new("X", 100, 0))
            .with_quote(TokenQuote::new(dec!(-1), Some(dec!(3))));
        assert!(!holding.is_priced());
        assert_eq!(holding.change_24h_pct(), Some(dec!(3)));
    }

    #[test]
    fn test_overflowing_value_is_unpriced() {
        let holding = TokenHolding::new(RawHolding::new("A", u64::MAX, 0))
            .with_quote(TokenQuote::new(dec!(10000000000), Some(dec!(-2))));
        assert!(!holding.is_priced());
        assert_eq!(holding.value(), None);
        assert_eq!(holding.change_24h_pct(), Some(dec!(-2)));
    }

    #[test]
    fn test_total_saturates_instead_of_overflowing() {
        let huge = priced("A", u64::MAX, 0, dec!(1000000000));
        let snapshot = PortfolioSnapshot::assemble(
            "addr",
            Decimal::MAX,
            Some(dec!(2)),
            vec![huge; 5],
        );
        assert_eq!(snapshot.native_price(), None);
        assert_eq!(snapshot.native_value(), Decimal::ZERO);
        assert_eq!(snapshot.total_value(), Decimal::MAX);
        assert!(snapshot.allocations().iter().all(|(_, pct)| *pct <= Decimal::ONE_HUNDRED));
    }

    #[test]
    fn test_snapshot_totals() {
        let holdings = vec![
            priced("A", 10, 0, dec!(3)),
            TokenHolding::new(RawHolding::new("B", 10, 0)),
        ];
        let snapshot =
            PortfolioSnapshot::from_lamports("addr", 2_000_000_000, Some(dec!(10)), holdings);

        assert_eq!(snapshot.native_balance(), dec!(2));
        assert_eq!(snapshot.native_value(), dec!(20));
        assert_eq!(snapshot.total_value(), dec!(50));
        assert_eq!(snapshot.asset_count(), 3);
        assert_eq!(snapshot.unpriced_count(), 1);
    }

    #[test]
    fn test_missing_native_price_zeroes_native_value() {
        let snapshot = PortfolioSnapshot::assemble("addr", dec!(5), None, Vec::new());
        assert_eq!(snapshot.native_value(), Decimal::ZERO);
        assert_eq!(snapshot.total_value(), Decimal::ZERO);
        assert_eq!(snapshot.native_share(), None);
    }

    #[test]
    fn test_allocations() {
        let snapshot = PortfolioSnapshot::assemble(
            "addr",
            dec!(1),
            Some(dec!(25)),
            vec![priced("A", 75, 0, dec!(1))],
        );

        let allocs = snapshot.allocations();
        assert_eq!(allocs[0], (AssetRef::Token("A".into()), dec!(75)));
        assert_eq!(allocs[1], (AssetRef::Native, dec!(25)));
    }
}
