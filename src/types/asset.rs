//! Asset Types
//!
//! Supported assets and the read-only registry that resolves them by symbol.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::units::{serde_decimal, Amount, MAX_DECIMALS};

/// A public token paired with its Tongo shielded contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Ticker, also the registry key (e.g. "STRK")
    pub symbol: String,
    /// Human-readable name
    pub name: String,
    /// Public token decimal precision
    pub decimals: u32,
    /// ERC-20 contract address
    pub erc20_address: String,
    /// Tongo (shielded) contract address
    pub tongo_address: String,
    /// Public units per shielded unit
    #[serde(with = "serde_decimal")]
    pub rate: Amount,
}

impl Asset {
    pub fn new(
        symbol: &str,
        name: &str,
        decimals: u32,
        erc20_address: &str,
        tongo_address: &str,
        rate: u128,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
            erc20_address: erc20_address.to_string(),
            tongo_address: tongo_address.to_string(),
            rate: Amount::from(rate),
        }
    }

    /// Validate static invariants. A zero rate is a configuration error.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.symbol.trim().is_empty() {
            return Err(RegistryError::InvalidAsset {
                symbol: self.symbol.clone(),
                reason: "empty symbol".to_string(),
            });
        }
        if self.rate.is_zero() {
            return Err(RegistryError::ZeroRate(self.symbol.clone()));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(RegistryError::InvalidAsset {
                symbol: self.symbol.clone(),
                reason: format!("decimals {} out of range", self.decimals),
            });
        }
        for (field, address) in [
            ("erc20_address", &self.erc20_address),
            ("tongo_address", &self.tongo_address),
        ] {
            if !is_valid_address(address) {
                return Err(RegistryError::InvalidAsset {
                    symbol: self.symbol.clone(),
                    reason: format!("malformed {}: {}", field, address),
                });
            }
        }
        Ok(())
    }
}

/// Check Starknet address syntax: `0x` followed by 1..=64 hex digits
pub fn is_valid_address(address: &str) -> bool {
    let Some(digits) = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
    else {
        return false;
    };
    !digits.is_empty() && digits.len() <= 64 && digits.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    #[error("asset {0} has a zero conversion rate")]
    ZeroRate(String),

    #[error("duplicate asset symbol: {0}")]
    Duplicate(String),

    #[error("invalid asset {symbol}: {reason}")]
    InvalidAsset { symbol: String, reason: String },

    #[error("asset table is empty")]
    Empty,

    #[error("failed to parse asset table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable symbol -> asset lookup
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: BTreeMap<String, Asset>,
}

impl AssetRegistry {
    /// Build from a table, validating every entry
    pub fn new(assets: Vec<Asset>) -> Result<Self, RegistryError> {
        if assets.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut map = BTreeMap::new();
        for asset in assets {
            asset.validate()?;
            if map.contains_key(&asset.symbol) {
                return Err(RegistryError::Duplicate(asset.symbol));
            }
            map.insert(asset.symbol.clone(), asset);
        }

        Ok(Self { assets: map })
    }

    /// Parse a JSON array of assets (rates as decimal strings)
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let assets: Vec<Asset> = serde_json::from_str(json)?;
        Self::new(assets)
    }

    /// Built-in Starknet mainnet table
    pub fn mainnet() -> Self {
        Self {
            assets: mainnet_assets()
                .into_iter()
                .map(|a| (a.symbol.clone(), a))
                .collect(),
        }
    }

    /// Look up an asset; exact symbol first, then ASCII case-insensitive
    pub fn get(&self, symbol: &str) -> Result<&Asset, RegistryError> {
        if let Some(asset) = self.assets.get(symbol) {
            return Ok(asset);
        }
        self.assets
            .values()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| RegistryError::UnknownAsset(symbol.to_string()))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_ok()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.assets.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Tongo deployments on Starknet mainnet
pub fn mainnet_assets() -> Vec<Asset> {
    vec![
        Asset::new(
            "STRK",
            "Starknet Token",
            18,
            "0x04718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d",
            "0x3a542d7eb73b3e33a2c54e9827ec17a6365e289ec35ccc94dde97950d9db498",
            50_000_000_000_000_000,
        ),
        Asset::new(
            "ETH",
            "Ether",
            18,
            "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7",
            "0x276e11a5428f6de18a38b7abc1d60abc75ce20aa3a925e20a393fcec9104f89",
            3_000_000_000_000,
        ),
        Asset::new(
            "wBTC",
            "Wrapped BTC",
            8,
            "0x053c91253bc9682c04929ca02ed00b3e423f6710d2ee7e0d5ebb06f3ecf368a8",
            "0x72098b84989a45cc00697431dfba300f1f5d144ae916e98287418af4e548d96",
            10,
        ),
        Asset::new(
            "USDC",
            "USD Coin",
            6,
            "0x033068f6539f8e6e6b131e6b2b814e6c34a5224bc66947c47dab9dfee93b35fb",
            "0x72098b84989a45cc00697431dfba300f1f5d144ae916e98287418af4e548d96",
            10_000,
        ),
        Asset::new(
            "USDT",
            "Tether",
            6,
            "0x068f5c6a61780768455de69077e07e89787839bf8166decfbf92b645209c0fb8",
            "0x659c62ba8bc3ac92ace36ba190b350451d0c767aa973dd63b042b59cc065da0",
            10_000,
        ),
    ]
}
