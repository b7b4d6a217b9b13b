//! Starknet JSON-RPC Ledger Client
//!
//! Minimal read-only access to the public ledger: ERC-20 balances through
//! `starknet_call`, plus the node's chain id. The same handle is passed to
//! shielded-account factories as their network access.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::types::units::{combine_limbs, Amount};

/// Public RPC endpoints
pub const MAINNET_RPC_URL: &str = "https://starknet-mainnet.public.blastapi.io/rpc/v0_7";
pub const SEPOLIA_RPC_URL: &str = "https://starknet-sepolia.public.blastapi.io/rpc/v0_7";

/// `starknet_keccak("balanceOf")`
pub const BALANCE_OF_SELECTOR: &str =
    "0x2e4263afad30923c891518314c3c95dbe830a16874e8abc5777a9a20b54c76e";

/// A Cairo `u256` as returned by `balanceOf`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceLimbs {
    pub low: u128,
    pub high: u128,
}

impl BalanceLimbs {
    pub fn value(&self) -> Amount {
        combine_limbs(self.low, self.high)
    }
}

/// Read boundary for public balances
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// ERC-20 balance of `holder` on `token`
    async fn balance_of(&self, token: &str, holder: &str) -> Result<BalanceLimbs, LedgerError>;
}

/// Network access: JSON-RPC endpoint plus the chain it is expected to serve
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    client: Client,
    rpc_url: String,
    chain_id: String,
}

impl NetworkHandle {
    /// Create a handle for a custom endpoint
    pub fn new(rpc_url: &str, chain_id: &str) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.trim_end_matches('/').to_string(),
            chain_id: chain_id.to_string(),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Chain id this handle was configured for
    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Read-only contract call at the latest block
    pub async fn call(
        &self,
        contract_address: &str,
        entry_point_selector: &str,
        calldata: Vec<String>,
    ) -> Result<Vec<String>, LedgerError> {
        let params = serde_json::json!({
            "request": {
                "contract_address": contract_address,
                "entry_point_selector": entry_point_selector,
                "calldata": calldata,
            },
            "block_id": "latest",
        });

        self.request("starknet_call", params).await
    }

    /// Ask the node which chain it serves
    pub async fn fetch_chain_id(&self) -> Result<String, LedgerError> {
        self.request("starknet_chainId", serde_json::json!([])).await
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, LedgerError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: 1,
        };

        let resp = self.client.post(&self.rpc_url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(LedgerError::Status(resp.status().as_u16()));
        }

        let text = resp.text().await?;
        parse_rpc_response(&text)
    }
}

#[async_trait]
impl LedgerReader for NetworkHandle {
    async fn balance_of(&self, token: &str, holder: &str) -> Result<BalanceLimbs, LedgerError> {
        let result = self
            .call(token, BALANCE_OF_SELECTOR, vec![holder.to_string()])
            .await?;
        limbs_from_result(&result)
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

fn parse_rpc_response<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, LedgerError> {
    let resp: RpcResponse<T> =
        serde_json::from_str(text).map_err(|e| LedgerError::ParseError(e.to_string()))?;

    if let Some(err) = resp.error {
        return Err(LedgerError::Rpc {
            code: err.code,
            message: err.message,
        });
    }

    resp.result
        .ok_or_else(|| LedgerError::ParseError("response has neither result nor error".to_string()))
}

/// Interpret a `balanceOf` result as `[low, high]`
pub fn limbs_from_result(result: &[String]) -> Result<BalanceLimbs, LedgerError> {
    match result {
        [low, high, ..] => Ok(BalanceLimbs {
            low: parse_limb(low)?,
            high: parse_limb(high)?,
        }),
        _ => Err(LedgerError::ParseError(format!(
            "expected 2 limbs, got {}",
            result.len()
        ))),
    }
}

/// Parse a felt-encoded 128-bit limb (`0x` hex or decimal)
pub fn parse_limb(value: &str) -> Result<u128, LedgerError> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(digits) if digits.is_empty() => Ok(0),
        Some(digits) => u128::from_str_radix(digits, 16),
        None => value.parse::<u128>(),
    };

    parsed.map_err(|_| LedgerError::ParseError(format!("invalid u128 limb: {}", value)))
}

/// Ledger errors
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("RPC returned HTTP status {0}")]
    Status(u16),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}
