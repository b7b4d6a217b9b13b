//! Environment-based Configuration for the Arcana Client
//!
//! # Environment Variables
//!
//! ## Network
//! - `ARCANA_NETWORK` - "mainnet" or "sepolia" (default: "mainnet")
//! - `ARCANA_RPC_URL` - Starknet JSON-RPC endpoint (default per network)
//!
//! ## Assets
//! - `ARCANA_ASSETS_FILE` - JSON asset table; required on sepolia
//! - `ARCANA_DEFAULT_ASSET` - Initially selected asset (default: "STRK")
//!
//! ## Timing
//! - `ARCANA_POLL_INTERVAL_SECS` - Balance polling period (default: 10)
//! - `ARCANA_CONFIRMATION_TIMEOUT_SECS` - Confirmation wait bound (default: 300)
//!
//! ## Logging
//! - `ARCANA_LOG_LEVEL` - trace, debug, info, warn, error (default: "info")
//! - `ARCANA_LOG_JSON` - Set to "1" for JSON output

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::ledger::{NetworkHandle, MAINNET_RPC_URL, SEPOLIA_RPC_URL};
use crate::types::asset::{AssetRegistry, RegistryError};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("cannot read asset table {path}: {source}")]
    AssetsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid asset table: {0}")]
    Registry(#[from] RegistryError),
}

/// Starknet network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Sepolia,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "sepolia" | "testnet" => Ok(Network::Sepolia),
            _ => Err(ConfigError::InvalidValue(
                "ARCANA_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Chain id as a short-string felt
    pub fn chain_id(&self) -> &'static str {
        match self {
            Network::Mainnet => "0x534e5f4d41494e",
            Network::Sepolia => "0x534e5f5345504f4c4941",
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_RPC_URL,
            Network::Sepolia => SEPOLIA_RPC_URL,
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct ArcanaConfig {
    pub network: Network,

    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// Optional JSON asset table
    pub assets_file: Option<String>,

    /// Asset selected at session start
    pub default_asset: String,

    pub poll_interval: Duration,

    pub confirmation_timeout: Duration,

    pub log_level: String,

    /// Emit JSON logs
    pub log_json: bool,
}

impl ArcanaConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network: Network = lookup("ARCANA_NETWORK")
            .unwrap_or_else(|| "mainnet".to_string())
            .parse()?;

        let rpc_url = lookup("ARCANA_RPC_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| network.default_rpc_url().to_string());
        if !rpc_url.starts_with("http://") && !rpc_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "ARCANA_RPC_URL".to_string(),
                format!("not an http(s) url: {}", rpc_url),
            ));
        }

        let assets_file = lookup("ARCANA_ASSETS_FILE").filter(|v| !v.trim().is_empty());
        if assets_file.is_none() && network != Network::Mainnet {
            // The built-in table only covers mainnet deployments
            return Err(ConfigError::MissingEnvVar("ARCANA_ASSETS_FILE".to_string()));
        }

        let default_asset = lookup("ARCANA_DEFAULT_ASSET").unwrap_or_else(|| "STRK".to_string());

        let poll_interval = parse_secs(&lookup, "ARCANA_POLL_INTERVAL_SECS", 10)?;
        let confirmation_timeout = parse_secs(&lookup, "ARCANA_CONFIRMATION_TIMEOUT_SECS", 300)?;

        let log_level = lookup("ARCANA_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_json = lookup("ARCANA_LOG_JSON").map(|v| v == "1").unwrap_or(false);

        Ok(Self {
            network,
            rpc_url,
            assets_file,
            default_asset,
            poll_interval,
            confirmation_timeout,
            log_level,
            log_json,
        })
    }

    /// Build the validated asset registry and check the default asset exists.
    ///
    /// Any failure here is fatal at startup.
    pub fn load_registry(&self) -> Result<AssetRegistry, ConfigError> {
        let registry = match &self.assets_file {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::AssetsFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                AssetRegistry::from_json(&json)?
            }
            None => AssetRegistry::mainnet(),
        };

        if !registry.contains(&self.default_asset) {
            return Err(ConfigError::InvalidValue(
                "ARCANA_DEFAULT_ASSET".to_string(),
                format!("{} is not in the asset table", self.default_asset),
            ));
        }

        Ok(registry)
    }

    /// Network access handle for the configured endpoint
    pub fn network_handle(&self) -> NetworkHandle {
        NetworkHandle::new(&self.rpc_url, self.network.chain_id())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== Arcana Configuration ===");
        println!("Network: {:?} ({})", self.network, self.network.chain_id());
        println!("RPC URL: {}", self.rpc_url);
        println!(
            "Asset Table: {}",
            self.assets_file.as_deref().unwrap_or("built-in (mainnet)")
        );
        println!("Default Asset: {}", self.default_asset);
        println!("Poll Interval: {}s", self.poll_interval.as_secs());
        println!("Confirmation Timeout: {}s", self.confirmation_timeout.as_secs());
        println!("Log Level: {}", self.log_level);
        println!("============================");
    }
}

fn parse_secs<F>(lookup: &F, var_name: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(var_name) {
        Some(value) => value.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), "must be a whole number".to_string())
        })?,
        None => default,
    };

    if secs == 0 {
        return Err(ConfigError::InvalidValue(
            var_name.to_string(),
            "must be positive".to_string(),
        ));
    }

    Ok(Duration::from_secs(secs))
}
