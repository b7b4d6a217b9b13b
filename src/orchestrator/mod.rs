//! Transaction Orchestration
//!
//! Turns a user-initiated [`PendingAction`](crate::types::PendingAction) into
//! one atomic multicall and follows it to finality:
//!
//! ```text
//! Idle -> Validating -> ProofGenerating -> AwaitingSignature
//!      -> AwaitingConfirmation -> Settled | Failed
//! ```
//!
//! # Modules
//!
//! - **builder**: amount / destination validation and call-list assembly
//! - **service**: the per-action state machine

pub mod builder;
pub mod service;

pub use builder::{CallBuilder, ValidatedAction};
pub use service::TransactionOrchestrator;

/// Action errors. Every variant is terminal for its action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("no shielded account for the selected asset")]
    NoShieldedAccount,

    #[error("proof generation failed: {0}")]
    ProofGeneration(String),

    #[error("rejected by signer: {0}")]
    SignerRejected(String),

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    #[error("confirmation failed: {0}")]
    ConfirmationFailed(String),

    #[error("not confirmed within {0} seconds")]
    ConfirmationTimeout(u64),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("another action is {0}")]
    ActionInProgress(String),
}

impl ActionError {
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::InvalidAmount(_) => "INVALID_AMOUNT",
            ActionError::InvalidDestination(_) => "INVALID_DESTINATION",
            ActionError::NoShieldedAccount => "NO_SHIELDED_ACCOUNT",
            ActionError::ProofGeneration(_) => "PROOF_GENERATION_FAILED",
            ActionError::SignerRejected(_) => "SIGNER_REJECTED",
            ActionError::BroadcastFailed(_) => "BROADCAST_FAILED",
            ActionError::ConfirmationFailed(_) => "CONFIRMATION_FAILED",
            ActionError::ConfirmationTimeout(_) => "CONFIRMATION_TIMEOUT",
            ActionError::Reverted(_) => "TRANSACTION_REVERTED",
            ActionError::ActionInProgress(_) => "ACTION_IN_PROGRESS",
        }
    }
}
