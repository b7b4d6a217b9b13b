//! Shielded Account Boundary
//!
//! The Tongo SDK does the cryptography (encryption, proofs, calldata). The
//! core only asks it for operation descriptors and the decrypted state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ShieldedError;
use crate::signer::Call;
use crate::types::units::Amount;

/// Decrypted account state, in shielded units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccountState {
    /// Confirmed spendable balance
    pub balance: Amount,
    /// Incoming amount awaiting rollover
    pub pending: Amount,
}

/// Which Tongo entrypoint an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Fund,
    Withdraw,
    Rollover,
}

/// A proven operation, ready to be turned into a contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    call: Call,
}

impl OperationDescriptor {
    pub fn new(kind: OperationKind, call: Call) -> Self {
        Self { kind, call }
    }

    pub fn to_call(&self) -> Call {
        self.call.clone()
    }
}

/// Shielded account operations
///
/// Every method may require proof generation or a network read and is
/// therefore async and fallible.
#[async_trait]
pub trait ShieldedAccount: Send + Sync {
    /// Move `amount` shielded units from `sender`'s public balance in
    async fn fund(&self, sender: &str, amount: Amount)
        -> Result<OperationDescriptor, ShieldedError>;

    /// Move `amount` shielded units out to the public `destination`
    async fn withdraw(
        &self,
        sender: &str,
        amount: Amount,
        destination: &str,
    ) -> Result<OperationDescriptor, ShieldedError>;

    /// Merge pending into the confirmed balance
    async fn rollover(&self, sender: &str) -> Result<OperationDescriptor, ShieldedError>;

    /// Read and decrypt the on-chain state
    async fn state(&self) -> Result<AccountState, ShieldedError>;
}
