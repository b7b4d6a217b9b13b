//! Shielded Protocol Boundary
//!
//! Traits for the Tongo shielded account and its factory, plus the
//! session-owned handle binding an account to one identity and one asset.

pub mod account;
pub mod factory;

pub use account::{AccountState, OperationDescriptor, OperationKind, ShieldedAccount};
pub use factory::{ShieldedAccountFactory, ShieldedAccountHandle};

/// Shielded account errors
#[derive(Debug, thiserror::Error)]
pub enum ShieldedError {
    #[error("malformed shielded contract address: {0}")]
    InvalidContractAddress(String),

    #[error("network unreachable: {0}")]
    Unreachable(String),

    #[error("account initialization failed: {0}")]
    InitFailed(String),

    #[error("proof generation failed: {0}")]
    Proof(String),

    #[error("state read failed: {0}")]
    State(String),
}
