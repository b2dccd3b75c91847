//! CoinGecko Price Service
//!
//! Spot prices, 24h change and token metadata from the CoinGecko public API.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;

use super::PriceService;
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Result};
use crate::model::{TokenMetadata, TokenQuote};

const PLATFORM: &str = "solana";
const NATIVE_ID: &str = "solana";

/// Price service backed by CoinGecko
pub struct CoinGeckoClient {
    http: reqwest::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self::new(config.price_api_url.clone())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        asset: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AdvisorError::enrichment(asset, e))?;
        response.json().await.map_err(|e| AdvisorError::enrichment(asset, e))
    }
}

#[async_trait]
impl PriceService for CoinGeckoClient {
    async fn token_quote(&self, asset_id: &str) -> Result<TokenQuote> {
        let prices: HashMap<String, SimplePrice> = self
            .get_json(
                asset_id,
                &format!("/simple/token_price/{PLATFORM}"),
                &[
                    ("contract_addresses", asset_id),
                    ("vs_currencies", "usd"),
                    ("include_24hr_change", "true"),
                ],
            )
            .await?;
        quote_from_prices(asset_id, &prices)
    }

    async fn native_price(&self) -> Result<Decimal> {
        let prices: HashMap<String, SimplePrice> = self
            .get_json(
                NATIVE_ID,
                "/simple/price",
                &[("ids", NATIVE_ID), ("vs_currencies", "usd")],
            )
            .await?;
        quote_from_prices(NATIVE_ID, &prices).map(|q| q.usd)
    }

    async fn token_metadata(&self, asset_id: &str) -> Result<Option<TokenMetadata>> {
        let url = format!("{}/coins/{PLATFORM}/contract/{asset_id}", self.base_url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AdvisorError::enrichment(asset_id, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let info: CoinInfo = response
            .error_for_status()
            .map_err(|e| AdvisorError::enrichment(asset_id, e))?
            .json()
            .await
            .map_err(|e| AdvisorError::enrichment(asset_id, e))?;
        Ok(Some(info.into()))
    }

    fn name(&self) -> &str {
        "CoinGecko"
    }
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinInfo {
    symbol: Option<String>,
    name: Option<String>,
    image: Option<CoinImage>,
}

#[derive(Debug, Deserialize)]
struct CoinImage {
    small: Option<String>,
    thumb: Option<String>,
}

impl From<CoinInfo> for TokenMetadata {
    fn from(info: CoinInfo) -> Self {
        Self {
            symbol: info.symbol,
            name: info.name,
            icon: info.image.and_then(|img| img.small.or(img.thumb)),
        }
    }
}

/// Pick the quote for `key` out of a simple-price response.
///
/// Keys are matched case-insensitively. A missing key or price is an
/// enrichment failure, never a zero price.
fn quote_from_prices(key: &str, prices: &HashMap<String, SimplePrice>) -> Result<TokenQuote> {
    let entry = prices
        .get(key)
        .or_else(|| {
            prices
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .ok_or_else(|| AdvisorError::enrichment(key, "not listed by price service"))?;

    let usd = entry
        .usd
        .and_then(Decimal::from_f64)
        .filter(|p| *p >= Decimal::ZERO)
        .ok_or_else(|| AdvisorError::enrichment(key, "missing or invalid usd price"))?;

    Ok(TokenQuote::new(usd, entry.usd_24h_change.and_then(Decimal::from_f64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(body: &str) -> HashMap<String, SimplePrice> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_token_quote() {
        let prices = parse(
            r#"{"epjfwdd5aufqssqem2qn1xzybapc8g4weggkzwytdt1v":
                {"usd":1.0,"usd_24h_change":-0.25}}"#,
        );
        let quote =
            quote_from_prices("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", &prices).unwrap();
        assert_eq!(quote.usd, dec!(1));
        assert_eq!(quote.usd_24h_change, Some(dec!(-0.25)));
    }

    #[test]
    fn test_quote_without_change() {
        let prices = parse(r#"{"solana":{"usd":182.4}}"#);
        let quote = quote_from_prices("solana", &prices).unwrap();
        assert_eq!(quote.usd, dec!(182.4));
        assert_eq!(quote.usd_24h_change, None);
    }

    #[test]
    fn test_unlisted_asset_is_enrichment_failure() {
        let err = quote_from_prices("mint", &parse("{}")).unwrap_err();
        assert!(!err.is_cycle_fatal());

        let err = quote_from_prices("mint", &parse(r#"{"mint":{}}"#)).unwrap_err();
        assert!(matches!(err, AdvisorError::EnrichmentUnavailable { .. }));
    }

    #[test]
    fn test_metadata_conversion() {
        let info: CoinInfo = serde_json::from_str(
            r#"{"symbol":"usdc","name":"USD Coin","image":{"thumb":"t.png","small":"s.png"}}"#,
        )
        .unwrap();
        let meta = TokenMetadata::from(info);
        assert_eq!(meta.symbol.as_deref(), Some("usdc"));
        assert_eq!(meta.icon.as_deref(), Some("s.png"));
    }
}
