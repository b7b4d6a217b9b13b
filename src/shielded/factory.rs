//! Shielded Account Factory
//!
//! Builds the session's shielded account for one (identity, asset) pair. A
//! handle is never rebound: when the identity or the asset changes the
//! session drops it and opens a new one.

use std::sync::Arc;

use async_trait::async_trait;

use super::account::ShieldedAccount;
use super::ShieldedError;
use crate::identity::Identity;
use crate::ledger::NetworkHandle;
use crate::types::asset::{is_valid_address, Asset};

/// Constructs shielded accounts (wraps the Tongo SDK constructor)
#[async_trait]
pub trait ShieldedAccountFactory: Send + Sync {
    /// May read contract metadata over `network`, hence async and fallible
    async fn create(
        &self,
        identity: &Identity,
        asset: &Asset,
        network: &NetworkHandle,
    ) -> Result<Arc<dyn ShieldedAccount>, ShieldedError>;
}

/// A live shielded account bound to one identity version and one asset
#[derive(Clone)]
pub struct ShieldedAccountHandle {
    account: Arc<dyn ShieldedAccount>,
    asset: Asset,
    identity_version: u64,
    owner: String,
    network: NetworkHandle,
}

impl ShieldedAccountHandle {
    /// Validate inputs and construct through `factory`
    pub async fn open(
        factory: &dyn ShieldedAccountFactory,
        identity: &Identity,
        identity_version: u64,
        asset: &Asset,
        network: &NetworkHandle,
    ) -> Result<Self, ShieldedError> {
        if !is_valid_address(&asset.tongo_address) {
            return Err(ShieldedError::InvalidContractAddress(
                asset.tongo_address.clone(),
            ));
        }

        let account = factory.create(identity, asset, network).await?;

        Ok(Self {
            account,
            asset: asset.clone(),
            identity_version,
            owner: identity.public_key_hex(),
            network: network.clone(),
        })
    }

    pub fn account(&self) -> &dyn ShieldedAccount {
        self.account.as_ref()
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn identity_version(&self) -> u64 {
        self.identity_version
    }

    /// Public key of the owning identity
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn network(&self) -> &NetworkHandle {
        &self.network
    }

    /// Whether this handle belongs to the given identity version and asset
    pub fn is_bound_to(&self, identity_version: u64, symbol: &str) -> bool {
        self.identity_version == identity_version && self.asset.symbol == symbol
    }
}

impl std::fmt::Debug for ShieldedAccountHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShieldedAccountHandle")
            .field("asset", &self.asset.symbol)
            .field("tongo_address", &self.asset.tongo_address)
            .field("identity_version", &self.identity_version)
            .field("owner", &self.owner)
            .finish()
    }
}
