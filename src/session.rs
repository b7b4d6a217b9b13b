//! Wallet Session
//!
//! Owns everything that lives for one connected wallet: the derived
//! identity, the selected asset, the shielded account handle, the balance
//! reconciler and the action orchestrator.
//!
//! The handle depends on (identity version, asset). Whenever either changes
//! the old handle is dropped synchronously and a new one is built in the
//! background of the same call. A build that finishes after its inputs were
//! superseded is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::common::error::{ArcanaError, Result};
use crate::common::logging::{generate_correlation_id, log_security_event};
use crate::identity::{Identity, IdentityDeriver};
use crate::ledger::{LedgerReader, NetworkHandle};
use crate::orchestrator::TransactionOrchestrator;
use crate::reconciler::{spawn_poller, BalanceReconciler, FetchContext, PollerHandle};
use crate::shielded::{ShieldedAccountFactory, ShieldedAccountHandle};
use crate::signer::WalletSigner;
use crate::types::action::{ActionKind, ActionRecord, PendingAction};
use crate::types::asset::{Asset, AssetRegistry};
use crate::types::balance::BalanceSnapshot;
use crate::types::units::Amount;

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Asset selected at start
    pub default_asset: String,
    pub confirmation_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            default_asset: "STRK".to_string(),
            confirmation_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    identity: Option<Identity>,
    /// Bumped on every login and logout
    identity_version: u64,
    asset: Asset,
    handle: Option<ShieldedAccountHandle>,
}

/// One connected wallet
pub struct WalletSession {
    signer: Arc<dyn WalletSigner>,
    factory: Arc<dyn ShieldedAccountFactory>,
    registry: AssetRegistry,
    network: NetworkHandle,
    deriver: IdentityDeriver,
    reconciler: Arc<BalanceReconciler>,
    orchestrator: TransactionOrchestrator,
    state: RwLock<SessionState>,
    initializing: AtomicBool,
}

impl WalletSession {
    pub fn new(
        registry: AssetRegistry,
        network: NetworkHandle,
        signer: Arc<dyn WalletSigner>,
        factory: Arc<dyn ShieldedAccountFactory>,
        ledger: Arc<dyn LedgerReader>,
        options: SessionOptions,
    ) -> Result<Self> {
        let asset = registry.get(&options.default_asset)?.clone();
        let reconciler = Arc::new(BalanceReconciler::new(ledger, &asset.symbol));
        let orchestrator = TransactionOrchestrator::new(
            signer.clone(),
            reconciler.clone(),
            options.confirmation_timeout,
        );

        Ok(Self {
            deriver: IdentityDeriver::new(network.chain_id()),
            signer,
            factory,
            registry,
            network,
            reconciler,
            orchestrator,
            state: RwLock::new(SessionState {
                identity: None,
                identity_version: 0,
                asset,
                handle: None,
            }),
            initializing: AtomicBool::new(false),
        })
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Derive the identity from a wallet signature and open the shielded
    /// account. Returns the identity's public key.
    ///
    /// On failure the previous identity (if any) stays in place.
    pub async fn login(&self) -> Result<String> {
        let correlation_id = generate_correlation_id();
        let address = self.signer.address();

        self.initializing.store(true, Ordering::SeqCst);
        let derived = self.deriver.login(self.signer.as_ref()).await;
        self.initializing.store(false, Ordering::SeqCst);

        let identity = match derived {
            Ok(identity) => identity,
            Err(e) => {
                log_security_event(
                    "login",
                    false,
                    serde_json::json!({ "address": address, "error": e.to_string() }),
                    Some(&correlation_id),
                );
                return Err(e.into());
            }
        };

        let public_key = identity.public_key_hex();
        let symbol = {
            let mut state = self.state.write().await;
            state.identity = Some(identity);
            state.identity_version += 1;
            state.handle = None;
            self.reconciler.invalidate(&state.asset.symbol).await;
            state.asset.symbol.clone()
        };

        log_security_event(
            "login",
            true,
            serde_json::json!({ "address": address, "public_key": public_key, "asset": symbol }),
            Some(&correlation_id),
        );

        let rebuilt = self.rebuild_handle().await;
        self.refresh_balances().await;
        rebuilt?;

        Ok(public_key)
    }

    /// Drop identity and handle. Shielded balances are zeroed, the public
    /// balance stays.
    pub async fn logout(&self) {
        let was_authenticated = {
            let mut state = self.state.write().await;
            let was = state.identity.take().is_some();
            state.identity_version += 1;
            state.handle = None;
            self.reconciler.clear_private().await;
            was
        };

        if was_authenticated {
            log_security_event(
                "logout",
                true,
                serde_json::json!({ "address": self.signer.address() }),
                None,
            );
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.identity.is_some()
    }

    /// Login signature requested but not yet resolved
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::SeqCst)
    }

    /// Public key of the current identity
    pub async fn public_key(&self) -> Option<String> {
        self.state
            .read()
            .await
            .identity
            .as_ref()
            .map(Identity::public_key_hex)
    }

    // ========================================================================
    // Assets
    // ========================================================================

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub async fn selected_asset(&self) -> Asset {
        self.state.read().await.asset.clone()
    }

    /// Public units per shielded unit of the selected asset
    pub async fn conversion_rate(&self) -> Amount {
        self.state.read().await.asset.rate
    }

    /// Switch the selected asset.
    ///
    /// Balances are marked loading before anything else happens; the
    /// previous asset's handle is discarded and a new one opened.
    pub async fn select_asset(&self, symbol: &str) -> Result<()> {
        let asset = self.registry.get(symbol)?.clone();

        {
            let mut state = self.state.write().await;
            if state.asset.symbol == asset.symbol {
                return Ok(());
            }
            state.handle = None;
            self.reconciler.invalidate(&asset.symbol).await;
            state.asset = asset;
        }

        tracing::info!(target: "arcana::session", asset = symbol, "asset selected");

        let rebuilt = self.rebuild_handle().await;
        self.refresh_balances().await;
        rebuilt
    }

    /// Open the shielded account for the current (identity, asset), unless
    /// inputs change while it is being built.
    async fn rebuild_handle(&self) -> Result<()> {
        let (identity, version, asset) = {
            let state = self.state.read().await;
            match &state.identity {
                Some(identity) => (identity.clone(), state.identity_version, state.asset.clone()),
                None => return Ok(()),
            }
        };

        let opened = ShieldedAccountHandle::open(
            self.factory.as_ref(),
            &identity,
            version,
            &asset,
            &self.network,
        )
        .await;

        let mut state = self.state.write().await;
        if state.identity_version != version || state.asset.symbol != asset.symbol {
            tracing::debug!(
                target: "arcana::session",
                asset = %asset.symbol,
                "discarding shielded account built for superseded inputs"
            );
            return Ok(());
        }

        match opened {
            Ok(handle) => {
                tracing::info!(target: "arcana::session", handle = ?handle, "shielded account ready");
                state.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    target: "arcana::session",
                    asset = %asset.symbol,
                    error = %e,
                    "shielded account initialization failed"
                );
                Err(e.into())
            }
        }
    }

    // ========================================================================
    // Balances
    // ========================================================================

    /// Inputs and epoch are read under one guard; every epoch bump happens
    /// under the write lock.
    async fn fetch_context(&self) -> FetchContext {
        let state = self.state.read().await;
        FetchContext {
            address: self.signer.address(),
            asset: state.asset.clone(),
            handle: state.handle.clone(),
            epoch: self.reconciler.epoch(),
        }
    }

    /// Reconcile now
    pub async fn refresh_balances(&self) -> BalanceSnapshot {
        let ctx = self.fetch_context().await;
        self.reconciler.fetch(&ctx).await
    }

    pub async fn snapshot(&self) -> BalanceSnapshot {
        self.reconciler.snapshot().await
    }

    /// Poll balances every `period` until the handle is stopped or dropped,
    /// or the session itself is dropped.
    pub fn start_polling(self: &Arc<Self>, period: Duration) -> PollerHandle {
        let session = Arc::downgrade(self);
        spawn_poller(period, move || {
            let session = session.clone();
            async move {
                match session.upgrade() {
                    Some(session) => {
                        session.refresh_balances().await;
                        true
                    }
                    None => false,
                }
            }
        })
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Move `amount` of the selected asset into the shielded balance
    pub async fn shield(&self, amount: &str) -> Result<ActionRecord> {
        self.run(PendingAction::shield(amount)).await
    }

    /// Move `amount` out to `destination` (blank: own address)
    pub async fn unshield(&self, amount: &str, destination: Option<&str>) -> Result<ActionRecord> {
        self.run(PendingAction::unshield(amount, destination.map(str::to_string)))
            .await
    }

    /// Roll pending incoming amounts into the confirmed balance
    pub async fn sync(&self) -> Result<ActionRecord> {
        self.run(PendingAction::sync()).await
    }

    pub async fn is_syncing(&self) -> bool {
        self.orchestrator.is_running(ActionKind::Sync)
    }

    /// Latest action record
    pub async fn current_action(&self) -> Option<ActionRecord> {
        self.orchestrator.current()
    }

    async fn run(&self, action: PendingAction) -> Result<ActionRecord> {
        if !self.is_authenticated().await {
            return Err(ArcanaError::NotAuthenticated);
        }

        let ctx = self.fetch_context().await;
        Ok(self.orchestrator.execute(action, &ctx).await?)
    }
}
