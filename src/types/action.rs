//! Action Types
//!
//! User-initiated shield / unshield / sync requests and their lifecycle record.

use serde::{Deserialize, Serialize};

/// Kind of shielded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Public -> shielded (Tongo `fund`)
    Shield,
    /// Shielded -> public (Tongo `withdraw`)
    Unshield,
    /// Pending -> confirmed shielded balance (Tongo `rollover`)
    Sync,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shield => write!(f, "shield"),
            Self::Unshield => write!(f, "unshield"),
            Self::Sync => write!(f, "sync"),
        }
    }
}

/// Lifecycle of a single action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Idle,
    /// Parsing amount and destination
    Validating,
    /// Shielded account is building the operation
    ProofGenerating,
    /// Call list handed to the wallet
    AwaitingSignature,
    /// Broadcast, waiting for finality
    AwaitingConfirmation,
    /// Confirmed and balances refreshed
    Settled,
    Failed,
}

impl Default for ActionStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Failed)
    }

    /// States during which no other action may start
    pub fn blocks_new_action(&self) -> bool {
        matches!(
            self,
            Self::Validating
                | Self::ProofGenerating
                | Self::AwaitingSignature
                | Self::AwaitingConfirmation
        )
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Validating => write!(f, "validating"),
            Self::ProofGenerating => write!(f, "proof_generating"),
            Self::AwaitingSignature => write!(f, "awaiting_signature"),
            Self::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            Self::Settled => write!(f, "settled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A transient request built from user input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    /// Raw decimal input; ignored for Sync
    pub amount: String,
    /// Unshield recipient; blank means the caller's own address
    pub destination: Option<String>,
}

impl PendingAction {
    pub fn shield(amount: impl Into<String>) -> Self {
        Self {
            kind: ActionKind::Shield,
            amount: amount.into(),
            destination: None,
        }
    }

    pub fn unshield(amount: impl Into<String>, destination: Option<String>) -> Self {
        Self {
            kind: ActionKind::Unshield,
            amount: amount.into(),
            destination,
        }
    }

    pub fn sync() -> Self {
        Self {
            kind: ActionKind::Sync,
            amount: String::new(),
            destination: None,
        }
    }
}

/// Progress record for one action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Unique action ID
    pub id: String,
    pub kind: ActionKind,
    /// Asset symbol the action runs against
    pub asset: String,
    pub status: ActionStatus,
    /// Parsed public amount (decimal string), once validated
    pub public_amount: Option<String>,
    /// Shielded amount (decimal string), once validated
    pub shielded_amount: Option<String>,
    /// Resolved recipient for Unshield
    pub destination: Option<String>,
    /// Transaction hash once broadcast
    pub tx_hash: Option<String>,
    /// Human-readable failure cause
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ActionRecord {
    pub fn new(kind: ActionKind, asset: &str) -> Self {
        let now = chrono::Utc::now().timestamp();

        Self {
            id: format!("act_{}", uuid::Uuid::new_v4().simple()),
            kind,
            asset: asset.to_string(),
            status: ActionStatus::Idle,
            public_amount: None,
            shielded_amount: None,
            destination: None,
            tx_hash: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_validating(&mut self) {
        self.set_status(ActionStatus::Validating);
    }

    pub fn mark_proof_generating(&mut self) {
        self.set_status(ActionStatus::ProofGenerating);
    }

    pub fn mark_awaiting_signature(&mut self) {
        self.set_status(ActionStatus::AwaitingSignature);
    }

    pub fn mark_awaiting_confirmation(&mut self, tx_hash: String) {
        self.tx_hash = Some(tx_hash);
        self.set_status(ActionStatus::AwaitingConfirmation);
    }

    pub fn mark_settled(&mut self) {
        self.set_status(ActionStatus::Settled);
    }

    pub fn mark_failed(&mut self, error: String) {
        self.error = Some(error);
        self.set_status(ActionStatus::Failed);
    }

    fn set_status(&mut self, status: ActionStatus) {
        self.status = status;
        self.updated_at = chrono::Utc::now().timestamp();
    }
}
