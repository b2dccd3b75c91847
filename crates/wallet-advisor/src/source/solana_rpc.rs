//! Solana JSON-RPC Ledger Client
//!
//! Reads native balances and SPL token accounts over HTTP JSON-RPC 2.0.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::LedgerClient;
use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Result};
use crate::model::RawHolding;

/// SPL token program id
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Ledger client backed by a Solana RPC node
pub struct SolanaRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl SolanaRpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self::new(config.rpc_url.clone())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AdvisorError::SourceUnavailable(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| AdvisorError::SourceUnavailable(format!("{method}: {e}")))?;

        response.into_result(method)
    }
}

#[async_trait]
impl LedgerClient for SolanaRpcClient {
    async fn native_balance(&self, address: &str) -> Result<u64> {
        let balance: WithContext<u64> = self.call("getBalance", json!([address])).await?;
        Ok(balance.value)
    }

    async fn token_holdings(&self, address: &str) -> Result<Vec<RawHolding>> {
        let accounts: WithContext<Vec<KeyedAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    address,
                    { "programId": TOKEN_PROGRAM_ID },
                    { "encoding": "jsonParsed" },
                ]),
            )
            .await?;

        accounts.value.into_iter().map(KeyedAccount::into_raw).collect()
    }

    fn name(&self) -> &str {
        "SolanaRpc"
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

impl<T> RpcResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if let Some(err) = self.error {
            return Err(AdvisorError::SourceUnavailable(format!(
                "{method}: RPC error {}: {}",
                err.code, err.message
            )));
        }
        self.result.ok_or_else(|| {
            AdvisorError::SourceUnavailable(format!("{method}: response has no result"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    account: AccountData,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    mint: String,
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    /// Raw amount as a decimal string
    amount: String,
    decimals: u8,
}

impl KeyedAccount {
    fn into_raw(self) -> Result<RawHolding> {
        let info = self.account.data.parsed.info;
        let raw_amount = info.token_amount.amount.parse::<u64>().map_err(|e| {
            AdvisorError::SourceUnavailable(format!(
                "bad token amount '{}' for {}: {e}",
                info.token_amount.amount, info.mint
            ))
        })?;
        Ok(RawHolding::new(info.mint, raw_amount, info.token_amount.decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balance() {
        let body = r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":2500000000},"id":1}"#;
        let response: RpcResponse<WithContext<u64>> = serde_json::from_str(body).unwrap();
        assert_eq!(response.into_result("getBalance").unwrap().value, 2_500_000_000);
    }

    #[test]
    fn test_parse_token_accounts() {
        let body = r#"{
            "jsonrpc": "2.0",
            "result": {
                "context": { "slot": 1 },
                "value": [{
                    "pubkey": "acct1",
                    "account": {
                        "data": {
                            "program": "spl-token",
                            "parsed": {
                                "type": "account",
                                "info": {
                                    "mint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                                    "owner": "owner",
                                    "tokenAmount": {
                                        "amount": "1500000",
                                        "decimals": 6,
                                        "uiAmount": 1.5,
                                        "uiAmountString": "1.5"
                                    }
                                }
                            },
                            "space": 165
                        },
                        "executable": false,
                        "lamports": 2039280
                    }
                }]
            },
            "id": 2
        }"#;

        let response: RpcResponse<WithContext<Vec<KeyedAccount>>> =
            serde_json::from_str(body).unwrap();
        let holdings: Vec<RawHolding> = response
            .into_result("getTokenAccountsByOwner")
            .unwrap()
            .value
            .into_iter()
            .map(|a| a.into_raw().unwrap())
            .collect();

        assert_eq!(
            holdings,
            vec![RawHolding::new("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 1_500_000, 6)]
        );
    }

    #[test]
    fn test_rpc_error_is_source_unavailable() {
        let body = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param"},"id":1}"#;
        let response: RpcResponse<WithContext<u64>> = serde_json::from_str(body).unwrap();
        let err = response.into_result("getBalance").unwrap_err();
        assert!(matches!(err, AdvisorError::SourceUnavailable(ref m) if m.contains("-32602")));
    }
}
