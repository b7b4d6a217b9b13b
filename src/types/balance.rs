//! Balance Snapshot Types

use serde::Serialize;

use super::units::{format_amount, Amount};

/// Outcome of the most recent reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// Nothing fetched yet for the current asset
    NotFetched,
    /// Every requested sub-fetch succeeded
    Complete,
    /// At least one sub-fetch failed; affected values are stale
    Partial { public_error: Option<String>, private_error: Option<String> },
}

impl FetchOutcome {
    pub fn is_stale(&self) -> bool {
        !matches!(self, FetchOutcome::Complete)
    }

    /// Ledger read error of the last fetch
    pub fn public_error(&self) -> Option<&str> {
        match self {
            FetchOutcome::Partial { public_error, .. } => public_error.as_deref(),
            _ => None,
        }
    }

    /// Shielded state read error of the last fetch
    pub fn private_error(&self) -> Option<&str> {
        match self {
            FetchOutcome::Partial { private_error, .. } => private_error.as_deref(),
            _ => None,
        }
    }
}

/// Public, private and pending balances of the selected asset
///
/// `private` is already multiplied by the asset rate, so it shares units with
/// `public`. `pending` stays in shielded units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    /// Asset the values belong to
    pub asset: String,
    /// Public ERC-20 balance (token base units)
    #[serde(serialize_with = "serialize_amount")]
    pub public: Amount,
    /// Decrypted shielded balance in public-token units
    #[serde(serialize_with = "serialize_amount")]
    pub private: Amount,
    /// Incoming shielded amount awaiting rollover (shielded units)
    #[serde(serialize_with = "serialize_amount")]
    pub pending: Amount,
    /// True until the first fetch for `asset` settles
    pub loading: bool,
    pub last_fetch: FetchOutcome,
    /// Unix seconds of the last applied fetch
    pub updated_at: Option<i64>,
}

fn serialize_amount<S: serde::Serializer>(amount: &Amount, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&amount.to_string())
}

impl BalanceSnapshot {
    /// Empty, loading snapshot for an asset
    pub fn loading(asset: &str) -> Self {
        Self {
            asset: asset.to_string(),
            public: Amount::zero(),
            private: Amount::zero(),
            pending: Amount::zero(),
            loading: true,
            last_fetch: FetchOutcome::NotFetched,
            updated_at: None,
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_zero()
    }

    /// One-line summary using the asset's decimals
    pub fn display(&self, decimals: u32) -> String {
        if self.loading {
            return format!("{}: loading...", self.asset);
        }
        format!(
            "{}: public {} | private {} | pending {}",
            self.asset,
            format_amount(self.public, decimals),
            format_amount(self.private, decimals),
            format_amount(self.pending, decimals),
        )
    }
}
