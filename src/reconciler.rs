//! Balance Reconciler
//!
//! Keeps the session's [`BalanceSnapshot`] in line with the ledger and the
//! shielded account. A fetch runs its public and private reads concurrently
//! and applies whatever succeeded; failures keep the previous values.
//!
//! Ordering: every fetch carries the epoch observed when its inputs were
//! read, and takes a sequence number when it starts. Asset switches and
//! logouts bump the epoch. A result is applied only if its epoch is still
//! current and no newer fetch has been applied, so a slow response can
//! never overwrite a fresher one.
//! No lock is held across a network call.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::common::logging::log_balance_event;
use crate::ledger::LedgerReader;
use crate::shielded::{AccountState, ShieldedAccountHandle};
use crate::types::asset::Asset;
use crate::types::balance::{BalanceSnapshot, FetchOutcome};
use crate::types::units::{to_public_units, Amount};

/// Inputs of one reconciliation
#[derive(Debug, Clone)]
pub struct FetchContext {
    /// Public account address of the connected wallet
    pub address: String,
    pub asset: Asset,
    /// Shielded account; `None` skips the private read
    pub handle: Option<ShieldedAccountHandle>,
    /// Reconciler epoch read together with `handle`
    pub epoch: u64,
}

#[derive(Debug)]
struct ReconcilerState {
    snapshot: BalanceSnapshot,
    /// Sequence number of the last applied fetch
    applied_seq: u64,
}

/// Balance reconciler
pub struct BalanceReconciler {
    ledger: Arc<dyn LedgerReader>,
    state: RwLock<ReconcilerState>,
    epoch: AtomicU64,
    next_seq: AtomicU64,
}

impl BalanceReconciler {
    pub fn new(ledger: Arc<dyn LedgerReader>, asset: &str) -> Self {
        Self {
            ledger,
            state: RwLock::new(ReconcilerState {
                snapshot: BalanceSnapshot::loading(asset),
                applied_seq: 0,
            }),
            epoch: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> BalanceSnapshot {
        self.state.read().await.snapshot.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Retarget to `asset`: drop in-flight results and start from a loading
    /// snapshot. Values are zeroed so units of two assets never mix.
    pub async fn invalidate(&self, asset: &str) {
        let mut state = self.state.write().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        state.snapshot = BalanceSnapshot::loading(asset);
        tracing::debug!(target: "arcana::balance", asset, "snapshot invalidated");
    }

    /// Forget shielded values (logout). The public balance stays.
    pub async fn clear_private(&self) {
        let mut state = self.state.write().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        state.snapshot.private = Amount::zero();
        state.snapshot.pending = Amount::zero();
    }

    /// Reconcile once and return the resulting snapshot.
    ///
    /// Never fails: sub-fetch errors are logged and recorded in
    /// `last_fetch`, and `loading` is cleared either way.
    pub async fn fetch(&self, ctx: &FetchContext) -> BalanceSnapshot {
        let epoch = ctx.epoch;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let started = Instant::now();

        let (public, private) = tokio::join!(self.fetch_public(ctx), self.fetch_private(ctx));

        let mut state = self.state.write().await;
        let current = epoch == self.epoch.load(Ordering::SeqCst)
            && seq > state.applied_seq
            && state.snapshot.asset == ctx.asset.symbol;

        let public_error = public.as_ref().err().cloned();
        let private_error = private.as_ref().err().cloned();
        let duration_ms = started.elapsed().as_millis() as u64;

        if !current {
            log_balance_event(
                &ctx.asset.symbol,
                false,
                public_error.as_deref(),
                private_error.as_deref(),
                duration_ms,
            );
            return state.snapshot.clone();
        }

        let snapshot = &mut state.snapshot;
        if let Ok(public) = public {
            snapshot.public = public;
        }
        if let Ok(Some(account)) = private {
            snapshot.private = to_public_units(account.balance, ctx.asset.rate);
            snapshot.pending = account.pending;
        }

        snapshot.loading = false;
        snapshot.last_fetch = if public_error.is_none() && private_error.is_none() {
            FetchOutcome::Complete
        } else {
            FetchOutcome::Partial {
                public_error: public_error.clone(),
                private_error: private_error.clone(),
            }
        };
        snapshot.updated_at = Some(chrono::Utc::now().timestamp());
        state.applied_seq = seq;

        log_balance_event(
            &ctx.asset.symbol,
            true,
            public_error.as_deref(),
            private_error.as_deref(),
            duration_ms,
        );

        state.snapshot.clone()
    }

    async fn fetch_public(&self, ctx: &FetchContext) -> Result<Amount, String> {
        self.ledger
            .balance_of(&ctx.asset.erc20_address, &ctx.address)
            .await
            .map(|limbs| limbs.value())
            .map_err(|e| e.to_string())
    }

    async fn fetch_private(&self, ctx: &FetchContext) -> Result<Option<AccountState>, String> {
        let Some(handle) = &ctx.handle else {
            return Ok(None);
        };

        if handle.asset().symbol != ctx.asset.symbol {
            return Err(format!(
                "shielded account is bound to {}, not {}",
                handle.asset().symbol,
                ctx.asset.symbol
            ));
        }

        handle
            .account()
            .state()
            .await
            .map(Some)
            .map_err(|e| e.to_string())
    }
}

/// Stops a background poller on `stop()` or when dropped
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Signal the poller and wait for it to exit
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Run `tick` every `period` until stopped or until `tick` returns false.
///
/// The first tick fires immediately.
pub fn spawn_poller<F, Fut>(period: Duration, mut tick: F) -> PollerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !tick().await {
                        break;
                    }
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(target: "arcana::balance", "poller stopped");
    });

    PollerHandle {
        stop_tx,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::ledger::{BalanceLimbs, LedgerError, MockLedgerReader, NetworkHandle};
    use crate::shielded::{
        OperationDescriptor, ShieldedAccount, ShieldedAccountFactory, ShieldedError,
    };
    use crate::types::asset::mainnet_assets;
    use async_trait::async_trait;
    use starknet_crypto::Felt;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct FixedAccount(Result<AccountState, String>);

    #[async_trait]
    impl ShieldedAccount for FixedAccount {
        async fn fund(&self, _: &str, _: Amount) -> Result<OperationDescriptor, ShieldedError> {
            Err(ShieldedError::Proof("unused".into()))
        }
        async fn withdraw(
            &self,
            _: &str,
            _: Amount,
            _: &str,
        ) -> Result<OperationDescriptor, ShieldedError> {
            Err(ShieldedError::Proof("unused".into()))
        }
        async fn rollover(&self, _: &str) -> Result<OperationDescriptor, ShieldedError> {
            Err(ShieldedError::Proof("unused".into()))
        }
        async fn state(&self) -> Result<AccountState, ShieldedError> {
            self.0.clone().map_err(ShieldedError::State)
        }
    }

    struct FixedFactory(Result<AccountState, String>);

    #[async_trait]
    impl ShieldedAccountFactory for FixedFactory {
        async fn create(
            &self,
            _: &Identity,
            _: &Asset,
            _: &NetworkHandle,
        ) -> Result<Arc<dyn ShieldedAccount>, ShieldedError> {
            Ok(Arc::new(FixedAccount(self.0.clone())))
        }
    }

    fn asset(symbol: &str) -> Asset {
        mainnet_assets()
            .into_iter()
            .find(|a| a.symbol == symbol)
            .unwrap()
    }

    async fn handle_for(asset: &Asset, state: Result<AccountState, String>) -> ShieldedAccountHandle {
        let identity = Identity::from_private_key(Felt::from(9u64)).unwrap();
        let network = NetworkHandle::new("http://127.0.0.1:1", "0x534e5f4d41494e");
        ShieldedAccountHandle::open(&FixedFactory(state), &identity, 1, asset, &network)
            .await
            .unwrap()
    }

    fn ledger_returning(low: u128, high: u128) -> MockLedgerReader {
        let mut ledger = MockLedgerReader::new();
        ledger
            .expect_balance_of()
            .returning(move |_, _| Ok(BalanceLimbs { low, high }));
        ledger
    }

    #[tokio::test]
    async fn test_fetch_combines_public_and_private() {
        let strk = asset("STRK");
        let mut ledger = MockLedgerReader::new();
        let token = strk.erc20_address.clone();
        ledger
            .expect_balance_of()
            .withf(move |t, holder| t == token.as_str() && holder == "0xabc")
            .times(1)
            .returning(|_, _| Ok(BalanceLimbs { low: 500, high: 0 }));

        let reconciler = BalanceReconciler::new(Arc::new(ledger), "STRK");
        let ctx = FetchContext {
            address: "0xabc".to_string(),
            epoch: reconciler.epoch(),
            handle: Some(
                handle_for(
                    &strk,
                    Ok(AccountState {
                        balance: Amount::from(20u64),
                        pending: Amount::zero(),
                    }),
                )
                .await,
            ),
            asset: strk,
        };

        let snap = reconciler.fetch(&ctx).await;

        assert_eq!(snap.public, Amount::from(500u64));
        assert_eq!(snap.private, Amount::from(1_000_000_000_000_000_000u128));
        assert_eq!(snap.pending, Amount::zero());
        assert!(!snap.loading);
        assert_eq!(snap.last_fetch, FetchOutcome::Complete);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_previous_values() {
        let strk = asset("STRK");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut ledger = MockLedgerReader::new();
        ledger.expect_balance_of().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(BalanceLimbs { low: 700, high: 0 })
            } else {
                Err(LedgerError::Status(503))
            }
        });

        let reconciler = BalanceReconciler::new(Arc::new(ledger), "STRK");
        let ctx = FetchContext {
            address: "0xabc".to_string(),
            epoch: reconciler.epoch(),
            asset: strk,
            handle: None,
        };

        reconciler.fetch(&ctx).await;
        let snap = reconciler.fetch(&ctx).await;

        assert_eq!(snap.public, Amount::from(700u64));
        assert!(!snap.loading);
        assert!(matches!(
            snap.last_fetch,
            FetchOutcome::Partial { public_error: Some(_), private_error: None }
        ));
    }

    #[tokio::test]
    async fn test_private_failure_does_not_block_public() {
        let strk = asset("STRK");
        let reconciler = BalanceReconciler::new(Arc::new(ledger_returning(42, 0)), "STRK");
        let ctx = FetchContext {
            address: "0xabc".to_string(),
            epoch: reconciler.epoch(),
            handle: Some(handle_for(&strk, Err("decrypt failed".to_string())).await),
            asset: strk,
        };

        let snap = reconciler.fetch(&ctx).await;

        assert_eq!(snap.public, Amount::from(42u64));
        assert_eq!(snap.private, Amount::zero());
        assert!(!snap.loading);
        assert!(snap.last_fetch.is_stale());
    }

    #[tokio::test]
    async fn test_invalidate_sets_loading_and_clears_values() {
        let strk = asset("STRK");
        let reconciler = BalanceReconciler::new(Arc::new(ledger_returning(42, 0)), "STRK");
        reconciler
            .fetch(&FetchContext {
                address: "0xabc".to_string(),
                epoch: reconciler.epoch(),
                asset: strk,
                handle: None,
            })
            .await;

        reconciler.invalidate("ETH").await;
        let snap = reconciler.snapshot().await;

        assert_eq!(snap.asset, "ETH");
        assert!(snap.loading);
        assert_eq!(snap.public, Amount::zero());
    }

    #[tokio::test]
    async fn test_clear_private_keeps_public() {
        let strk = asset("STRK");
        let reconciler = BalanceReconciler::new(Arc::new(ledger_returning(42, 0)), "STRK");
        let ctx = FetchContext {
            address: "0xabc".to_string(),
            epoch: reconciler.epoch(),
            handle: Some(
                handle_for(
                    &strk,
                    Ok(AccountState {
                        balance: Amount::one(),
                        pending: Amount::from(3u64),
                    }),
                )
                .await,
            ),
            asset: strk,
        };
        reconciler.fetch(&ctx).await;

        reconciler.clear_private().await;
        let snap = reconciler.snapshot().await;

        assert_eq!(snap.public, Amount::from(42u64));
        assert_eq!(snap.private, Amount::zero());
        assert_eq!(snap.pending, Amount::zero());
    }

    #[tokio::test]
    async fn test_fetch_read_before_logout_is_discarded() {
        let strk = asset("STRK");
        let reconciler = BalanceReconciler::new(Arc::new(ledger_returning(42, 0)), "STRK");
        let ctx = FetchContext {
            address: "0xabc".to_string(),
            epoch: reconciler.epoch(),
            handle: Some(
                handle_for(
                    &strk,
                    Ok(AccountState {
                        balance: Amount::from(20u64),
                        pending: Amount::from(5u64),
                    }),
                )
                .await,
            ),
            asset: strk,
        };

        reconciler.clear_private().await;
        let snap = reconciler.fetch(&ctx).await;

        assert_eq!(snap.private, Amount::zero());
        assert_eq!(snap.pending, Amount::zero());
        assert!(snap.loading);
    }

    /// Ledger whose reads of `gated_token` block until released
    struct GatedLedger {
        gate: Arc<Notify>,
        gated_token: String,
    }

    #[async_trait]
    impl LedgerReader for GatedLedger {
        async fn balance_of(&self, token: &str, _: &str) -> Result<BalanceLimbs, LedgerError> {
            if token == self.gated_token {
                self.gate.notified().await;
                Ok(BalanceLimbs { low: 1, high: 0 })
            } else {
                Ok(BalanceLimbs { low: 2, high: 0 })
            }
        }
    }

    #[tokio::test]
    async fn test_stale_fetch_discarded_after_asset_switch() {
        let gate = Arc::new(Notify::new());
        let reconciler = Arc::new(BalanceReconciler::new(
            Arc::new(GatedLedger {
                gate: gate.clone(),
                gated_token: asset("STRK").erc20_address,
            }),
            "STRK",
        ));

        let stale_ctx = FetchContext {
            address: "0xabc".to_string(),
            epoch: reconciler.epoch(),
            asset: asset("STRK"),
            handle: None,
        };
        let slow = {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.fetch(&stale_ctx).await })
        };
        tokio::task::yield_now().await;

        reconciler.invalidate("ETH").await;
        let eth = reconciler
            .fetch(&FetchContext {
                address: "0xabc".to_string(),
                epoch: reconciler.epoch(),
                asset: asset("ETH"),
                handle: None,
            })
            .await;
        assert_eq!(eth.public, Amount::from(2u64));

        gate.notify_one();
        slow.await.unwrap();

        let snap = reconciler.snapshot().await;
        assert_eq!(snap.asset, "ETH");
        assert_eq!(snap.public, Amount::from(2u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let poller = spawn_poller(Duration::from_secs(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(poller.is_running());

        poller.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_exits_when_tick_declines() {
        let poller = spawn_poller(Duration::from_secs(1), || async { false });
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!poller.is_running());
    }
}
