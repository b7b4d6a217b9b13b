//! Wallet Signer Boundary
//!
//! The connected wallet (browser extension, hardware wallet, local account)
//! is an external collaborator. The core needs exactly four capabilities from
//! it: its account address, typed-message signing, atomic multicall execution
//! and a confirmation wait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::identity::{TypedData, WalletSignature};
use crate::types::units::{split_limbs, Amount};

/// A single contract invocation inside a multicall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub contract_address: String,
    pub entrypoint: String,
    /// Felt-encoded arguments (`0x` hex)
    pub calldata: Vec<String>,
}

impl Call {
    pub fn new(contract_address: &str, entrypoint: &str, calldata: Vec<String>) -> Self {
        Self {
            contract_address: contract_address.to_string(),
            entrypoint: entrypoint.to_string(),
            calldata,
        }
    }

    /// ERC-20 `approve(spender, amount: u256)`
    pub fn approve(token: &str, spender: &str, amount: Amount) -> Self {
        let (low, high) = split_limbs(amount);
        Self::new(
            token,
            "approve",
            vec![
                spender.to_string(),
                format!("{:#x}", low),
                format!("{:#x}", high),
            ],
        )
    }
}

/// Handle to a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub transaction_hash: String,
}

/// Final execution status reported by the network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutcome {
    Accepted,
    Reverted { reason: String },
}

/// Wallet signer trait
///
/// Every method except `address` is a suspension point of indeterminate
/// latency (user interaction or network round trips).
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Connected account address
    fn address(&self) -> String;

    /// Request a signature over a typed message
    async fn sign_typed_data(&self, data: &TypedData) -> Result<WalletSignature, SignerError>;

    /// Execute the calls, in order, as one atomic transaction
    async fn execute(&self, calls: &[Call]) -> Result<TxHandle, SignerError>;

    /// Wait until the network reports the transaction as final
    async fn wait_for_confirmation(&self, tx: &TxHandle) -> Result<TxOutcome, SignerError>;
}

/// Signer errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SignerError {
    #[error("request rejected by user: {0}")]
    Rejected(String),

    #[error("broadcast failed: {0}")]
    Broadcast(String),

    #[error("confirmation failed: {0}")]
    Confirmation(String),

    #[error("wallet transport error: {0}")]
    Transport(String),
}
