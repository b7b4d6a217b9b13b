//! Common Error Types for the Arcana Client
//!
//! Module errors fold into [`ArcanaError`], whose variants are the failure
//! classes a caller of the session reacts to.

use thiserror::Error;

use crate::identity::IdentityError;
use crate::ledger::LedgerError;
use crate::orchestrator::ActionError;
use crate::shielded::ShieldedError;
use crate::types::asset::RegistryError;

/// Root error type for the Arcana client
#[derive(Debug, Error)]
pub enum ArcanaError {
    #[error("unknown asset: {0}")]
    UnknownAsset(String),

    /// Signer or derivation fault during login
    #[error("login failed: {0}")]
    LoginFailed(String),

    #[error("shielded account initialization failed: {0}")]
    AccountInitFailed(String),

    /// Non-fatal; the snapshot keeps its previous values
    #[error("balance fetch failed: {0}")]
    FetchFailed(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("proof generation failed: {0}")]
    ProofFailed(String),

    #[error("signer rejected the request: {0}")]
    SignerRejected(String),

    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    /// Confirmation did not arrive in time or could not be observed
    #[error("transaction not confirmed: {0}")]
    ConfirmationTimeout(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("another action is {0}")]
    ActionInProgress(String),

    #[error("not logged in")]
    NotAuthenticated,

    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),

    #[error("logging error: {0}")]
    Logging(#[from] super::logging::LoggingError),
}

impl ArcanaError {
    /// Whether a new user-initiated attempt can succeed without changing
    /// input or configuration. Nothing is retried automatically.
    pub fn is_user_retryable(&self) -> bool {
        matches!(
            self,
            ArcanaError::LoginFailed(_)
                | ArcanaError::AccountInitFailed(_)
                | ArcanaError::FetchFailed(_)
                | ArcanaError::ProofFailed(_)
                | ArcanaError::SignerRejected(_)
                | ArcanaError::BroadcastFailed(_)
                | ArcanaError::ConfirmationTimeout(_)
                | ArcanaError::ActionInProgress(_)
        )
    }

    /// Stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ArcanaError::UnknownAsset(_) => "UNKNOWN_ASSET",
            ArcanaError::LoginFailed(_) => "LOGIN_FAILED",
            ArcanaError::AccountInitFailed(_) => "ACCOUNT_INIT_FAILED",
            ArcanaError::FetchFailed(_) => "FETCH_FAILED",
            ArcanaError::InvalidAmount(_) => "INVALID_AMOUNT",
            ArcanaError::InvalidDestination(_) => "INVALID_DESTINATION",
            ArcanaError::ProofFailed(_) => "PROOF_GENERATION_FAILED",
            ArcanaError::SignerRejected(_) => "SIGNER_REJECTED",
            ArcanaError::BroadcastFailed(_) => "BROADCAST_FAILED",
            ArcanaError::ConfirmationTimeout(_) => "CONFIRMATION_TIMEOUT",
            ArcanaError::Reverted(_) => "TRANSACTION_REVERTED",
            ArcanaError::ActionInProgress(_) => "ACTION_IN_PROGRESS",
            ArcanaError::NotAuthenticated => "NOT_AUTHENTICATED",
            ArcanaError::Config(_) => "CONFIG_ERROR",
            ArcanaError::Logging(_) => "LOGGING_ERROR",
        }
    }
}

impl From<RegistryError> for ArcanaError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownAsset(symbol) => ArcanaError::UnknownAsset(symbol),
            other => ArcanaError::Config(other.into()),
        }
    }
}

impl From<IdentityError> for ArcanaError {
    fn from(err: IdentityError) -> Self {
        ArcanaError::LoginFailed(err.to_string())
    }
}

impl From<ShieldedError> for ArcanaError {
    fn from(err: ShieldedError) -> Self {
        ArcanaError::AccountInitFailed(err.to_string())
    }
}

impl From<LedgerError> for ArcanaError {
    fn from(err: LedgerError) -> Self {
        ArcanaError::FetchFailed(err.to_string())
    }
}

impl From<ActionError> for ArcanaError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::InvalidAmount(m) => ArcanaError::InvalidAmount(m),
            ActionError::InvalidDestination(m) => ArcanaError::InvalidDestination(m),
            ActionError::NoShieldedAccount => {
                ArcanaError::AccountInitFailed("no shielded account for the selected asset".into())
            }
            ActionError::ProofGeneration(m) => ArcanaError::ProofFailed(m),
            ActionError::SignerRejected(m) => ArcanaError::SignerRejected(m),
            ActionError::BroadcastFailed(m) => ArcanaError::BroadcastFailed(m),
            e @ (ActionError::ConfirmationFailed(_) | ActionError::ConfirmationTimeout(_)) => {
                ArcanaError::ConfirmationTimeout(e.to_string())
            }
            ActionError::Reverted(m) => ArcanaError::Reverted(m),
            ActionError::ActionInProgress(status) => ArcanaError::ActionInProgress(status),
        }
    }
}

/// Result type alias using ArcanaError
pub type Result<T> = std::result::Result<T, ArcanaError>;
