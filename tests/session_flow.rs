//! End-to-end session flows against in-memory fakes of the wallet, the
//! ledger and the Tongo account.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arcana::identity::{TypedData, WalletSignature};
use arcana::{
    AccountState, ActionStatus, Amount, ArcanaError, Asset, AssetRegistry, BalanceLimbs, Call,
    Identity, LedgerError, LedgerReader, NetworkHandle, OperationDescriptor, OperationKind,
    SessionOptions, ShieldedAccount, ShieldedAccountFactory, ShieldedError, SignerError,
    TxHandle, TxOutcome, WalletSession, WalletSigner,
};
use async_trait::async_trait;
use tokio::sync::Notify;

const SENDER: &str = "0x0123abc";
const ONE_STRK: u128 = 1_000_000_000_000_000_000;

// ============================================================================
// Fakes
// ============================================================================

/// Blocks callers until opened
struct Gate {
    open: AtomicBool,
    notify: Notify,
}

impl Gate {
    fn closed() -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(false),
            notify: Notify::new(),
        })
    }

    fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    async fn pass(&self) {
        loop {
            let notified = self.notify.notified();
            if self.open.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Default)]
struct FakeLedger {
    balances: Mutex<HashMap<String, BalanceLimbs>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    reads: AtomicUsize,
}

impl FakeLedger {
    fn set_balance(&self, token: &str, low: u128) {
        self.balances
            .lock()
            .unwrap()
            .insert(token.to_string(), BalanceLimbs { low, high: 0 });
    }

    fn gate(&self, token: &str) -> Arc<Gate> {
        let gate = Gate::closed();
        self.gates
            .lock()
            .unwrap()
            .insert(token.to_string(), gate.clone());
        gate
    }
}

#[async_trait]
impl LedgerReader for FakeLedger {
    async fn balance_of(&self, token: &str, _holder: &str) -> Result<BalanceLimbs, LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(token).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(token)
            .copied()
            .unwrap_or(BalanceLimbs { low: 0, high: 0 }))
    }
}

struct FakeAccount {
    contract: String,
    state: Result<AccountState, String>,
    fund_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ShieldedAccount for FakeAccount {
    async fn fund(&self, sender: &str, amount: Amount) -> Result<OperationDescriptor, ShieldedError> {
        self.fund_calls.fetch_add(1, Ordering::SeqCst);
        Ok(OperationDescriptor::new(
            OperationKind::Fund,
            Call::new(&self.contract, "fund", vec![sender.to_string(), amount.to_string()]),
        ))
    }

    async fn withdraw(
        &self,
        sender: &str,
        amount: Amount,
        to: &str,
    ) -> Result<OperationDescriptor, ShieldedError> {
        Ok(OperationDescriptor::new(
            OperationKind::Withdraw,
            Call::new(
                &self.contract,
                "withdraw",
                vec![sender.to_string(), amount.to_string(), to.to_string()],
            ),
        ))
    }

    async fn rollover(&self, sender: &str) -> Result<OperationDescriptor, ShieldedError> {
        Ok(OperationDescriptor::new(
            OperationKind::Rollover,
            Call::new(&self.contract, "rollover", vec![sender.to_string()]),
        ))
    }

    async fn state(&self) -> Result<AccountState, ShieldedError> {
        self.state.clone().map_err(ShieldedError::State)
    }
}

#[derive(Default)]
struct FakeFactory {
    creates: AtomicUsize,
    fund_calls: Arc<AtomicUsize>,
    states: Mutex<HashMap<String, AccountState>>,
    state_error: Mutex<Option<String>>,
    fail: AtomicBool,
}

impl FakeFactory {
    fn set_state(&self, symbol: &str, balance: u64, pending: u64) {
        self.states.lock().unwrap().insert(
            symbol.to_string(),
            AccountState {
                balance: Amount::from(balance),
                pending: Amount::from(pending),
            },
        );
    }
}

#[async_trait]
impl ShieldedAccountFactory for FakeFactory {
    async fn create(
        &self,
        _identity: &Identity,
        asset: &Asset,
        _network: &NetworkHandle,
    ) -> Result<Arc<dyn ShieldedAccount>, ShieldedError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ShieldedError::Unreachable("connection refused".to_string()));
        }
        let state = match self.state_error.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(self
                .states
                .lock()
                .unwrap()
                .get(&asset.symbol)
                .copied()
                .unwrap_or_default()),
        };
        Ok(Arc::new(FakeAccount {
            contract: asset.tongo_address.clone(),
            state,
            fund_calls: self.fund_calls.clone(),
        }))
    }
}

struct FakeSigner {
    reject_login: AtomicBool,
    signature: Mutex<WalletSignature>,
    executed: Mutex<Vec<Vec<Call>>>,
    confirm_gate: Mutex<Option<Arc<Gate>>>,
}

impl Default for FakeSigner {
    fn default() -> Self {
        Self {
            reject_login: AtomicBool::new(false),
            signature: Mutex::new(WalletSignature::pair("0x1234", "0x5678")),
            executed: Mutex::new(Vec::new()),
            confirm_gate: Mutex::new(None),
        }
    }
}

#[async_trait]
impl WalletSigner for FakeSigner {
    fn address(&self) -> String {
        SENDER.to_string()
    }

    async fn sign_typed_data(&self, data: &TypedData) -> Result<WalletSignature, SignerError> {
        assert_eq!(data.primary_type, "Message");
        if self.reject_login.load(Ordering::SeqCst) {
            return Err(SignerError::Rejected("user closed the prompt".to_string()));
        }
        Ok(self.signature.lock().unwrap().clone())
    }

    async fn execute(&self, calls: &[Call]) -> Result<TxHandle, SignerError> {
        self.executed.lock().unwrap().push(calls.to_vec());
        Ok(TxHandle {
            transaction_hash: "0x7e57".to_string(),
        })
    }

    async fn wait_for_confirmation(&self, _tx: &TxHandle) -> Result<TxOutcome, SignerError> {
        let gate = self.confirm_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        Ok(TxOutcome::Accepted)
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    session: Arc<WalletSession>,
    signer: Arc<FakeSigner>,
    ledger: Arc<FakeLedger>,
    factory: Arc<FakeFactory>,
    registry: AssetRegistry,
}

impl Harness {
    fn new() -> Self {
        let registry = AssetRegistry::mainnet();
        let signer = Arc::new(FakeSigner::default());
        let ledger = Arc::new(FakeLedger::default());
        let factory = Arc::new(FakeFactory::default());

        let session = WalletSession::new(
            registry.clone(),
            NetworkHandle::new("http://127.0.0.1:1", "0x534e5f4d41494e"),
            signer.clone(),
            factory.clone(),
            ledger.clone(),
            SessionOptions::default(),
        )
        .unwrap();

        Self {
            session: Arc::new(session),
            signer,
            ledger,
            factory,
            registry,
        }
    }

    fn asset(&self, symbol: &str) -> Asset {
        self.registry.get(symbol).unwrap().clone()
    }
}

async fn wait_until<F, Fut>(mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..1000 {
        if cond().await {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn strk_shield_submits_approval_before_fund() {
    let h = Harness::new();
    let strk = h.asset("STRK");
    h.ledger.set_balance(&strk.erc20_address, 5 * ONE_STRK);

    h.session.login().await.unwrap();
    let record = h.session.shield("1.0").await.unwrap();

    assert_eq!(record.status, ActionStatus::Settled);
    assert_eq!(record.public_amount.as_deref(), Some("1000000000000000000"));
    assert_eq!(record.shielded_amount.as_deref(), Some("20"));

    let executed = h.signer.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    assert_eq!(
        executed[0],
        vec![
            Call::new(
                &strk.erc20_address,
                "approve",
                vec![
                    strk.tongo_address.clone(),
                    "0xde0b6b3a7640000".to_string(),
                    "0x0".to_string()
                ],
            ),
            Call::new(
                &strk.tongo_address,
                "fund",
                vec![SENDER.to_string(), "20".to_string()]
            ),
        ]
    );
}

#[tokio::test]
async fn ledger_limbs_and_shielded_state_reconcile() {
    let h = Harness::new();
    let strk = h.asset("STRK");
    h.ledger.set_balance(&strk.erc20_address, 500);
    h.factory.set_state("STRK", 20, 0);

    h.session.login().await.unwrap();
    let snap = h.session.refresh_balances().await;

    assert_eq!(snap.asset, "STRK");
    assert_eq!(snap.public, Amount::from(500u64));
    assert_eq!(snap.private, Amount::from(ONE_STRK));
    assert_eq!(snap.pending, Amount::zero());
    assert!(!snap.loading);
}

#[tokio::test]
async fn zero_amount_never_reaches_proof_generation() {
    let h = Harness::new();
    h.session.login().await.unwrap();

    let err = h.session.shield("0").await.unwrap_err();

    assert!(matches!(err, ArcanaError::InvalidAmount(_)));
    assert_eq!(h.factory.fund_calls.load(Ordering::SeqCst), 0);
    assert!(h.signer.executed.lock().unwrap().is_empty());
    let record = h.session.current_action().await.unwrap();
    assert_eq!(record.status, ActionStatus::Failed);
}

#[tokio::test]
async fn unshield_defaults_to_own_address() {
    let h = Harness::new();
    h.factory.set_state("STRK", 40, 0);
    h.session.login().await.unwrap();

    h.session.unshield("1", Some("  ")).await.unwrap();

    let executed = h.signer.executed.lock().unwrap();
    assert_eq!(executed[0].len(), 1);
    assert_eq!(
        executed[0][0].calldata,
        vec![SENDER.to_string(), "20".to_string(), SENDER.to_string()]
    );
}

#[tokio::test]
async fn unshield_proceeds_when_shielded_state_unreadable() {
    let h = Harness::new();
    *h.factory.state_error.lock().unwrap() = Some("rpc down".to_string());
    h.session.login().await.unwrap();

    let snap = h.session.snapshot().await;
    assert!(!snap.loading);
    assert_eq!(snap.last_fetch.private_error(), Some("rpc down"));
    assert_eq!(snap.private, Amount::zero());

    let record = h.session.unshield("1", None).await.unwrap();

    assert_eq!(record.status, ActionStatus::Settled);
    let executed = h.signer.executed.lock().unwrap();
    assert_eq!(executed[0][0].entrypoint, "withdraw");
}

#[tokio::test]
async fn failed_login_keeps_previous_identity() {
    let h = Harness::new();
    let first = h.session.login().await.unwrap();
    assert_eq!(h.factory.creates.load(Ordering::SeqCst), 1);

    h.signer.reject_login.store(true, Ordering::SeqCst);
    let err = h.session.login().await.unwrap_err();

    assert_eq!(err.error_code(), "LOGIN_FAILED");
    assert!(h.session.is_authenticated().await);
    assert!(!h.session.is_initializing());
    assert_eq!(h.session.public_key().await, Some(first));
    assert_eq!(h.factory.creates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn same_signature_derives_same_identity() {
    let h = Harness::new();
    let first = h.session.login().await.unwrap();
    h.session.logout().await;
    let second = h.session.login().await.unwrap();
    assert_eq!(first, second);

    *h.signer.signature.lock().unwrap() = WalletSignature::pair("0x1234", "0x5679");
    let third = h.session.login().await.unwrap();
    assert_ne!(first, third);
}

#[tokio::test]
async fn actions_require_login() {
    let h = Harness::new();
    let err = h.session.sync().await.unwrap_err();
    assert!(matches!(err, ArcanaError::NotAuthenticated));
}

#[tokio::test]
async fn account_init_failure_surfaces_and_blocks_actions() {
    let h = Harness::new();
    h.factory.fail.store(true, Ordering::SeqCst);

    let err = h.session.login().await.unwrap_err();
    assert_eq!(err.error_code(), "ACCOUNT_INIT_FAILED");
    assert!(h.session.is_authenticated().await);

    let err = h.session.sync().await.unwrap_err();
    assert_eq!(err.error_code(), "ACCOUNT_INIT_FAILED");
}

#[tokio::test]
async fn logout_zeroes_shielded_balances_only() {
    let h = Harness::new();
    let strk = h.asset("STRK");
    h.ledger.set_balance(&strk.erc20_address, 500);
    h.factory.set_state("STRK", 20, 3);
    h.session.login().await.unwrap();
    h.session.refresh_balances().await;

    h.session.logout().await;
    let snap = h.session.snapshot().await;

    assert!(!h.session.is_authenticated().await);
    assert_eq!(snap.public, Amount::from(500u64));
    assert_eq!(snap.private, Amount::zero());
    assert_eq!(snap.pending, Amount::zero());
}

#[tokio::test]
async fn unknown_asset_leaves_selection_untouched() {
    let h = Harness::new();
    let err = h.session.select_asset("DOGE").await.unwrap_err();
    assert!(matches!(err, ArcanaError::UnknownAsset(_)));
    assert_eq!(h.session.selected_asset().await.symbol, "STRK");
}

#[tokio::test]
async fn asset_switch_marks_loading_then_uses_new_units() {
    let h = Harness::new();
    let strk = h.asset("STRK");
    let eth = h.asset("ETH");
    h.ledger.set_balance(&strk.erc20_address, 5 * ONE_STRK);
    h.ledger.set_balance(&eth.erc20_address, 7);
    h.factory.set_state("STRK", 20, 0);
    h.factory.set_state("ETH", 2, 1);
    h.session.login().await.unwrap();

    let gate = h.ledger.gate(&eth.erc20_address);
    let switch = {
        let session = h.session.clone();
        tokio::spawn(async move { session.select_asset("ETH").await })
    };

    let session = h.session.clone();
    wait_until(|| {
        let session = session.clone();
        async move { session.snapshot().await.asset == "ETH" }
    })
    .await;
    let snap = h.session.snapshot().await;
    assert!(snap.loading);
    assert_eq!(snap.private, Amount::zero());

    gate.open();
    switch.await.unwrap().unwrap();

    let snap = h.session.snapshot().await;
    assert!(!snap.loading);
    assert_eq!(snap.public, Amount::from(7u64));
    assert_eq!(snap.private, Amount::from(2u64) * eth.rate);
    assert_eq!(snap.pending, Amount::one());
    assert_eq!(h.session.conversion_rate().await, eth.rate);
}

#[tokio::test]
async fn stale_fetch_cannot_overwrite_newer_asset() {
    let h = Harness::new();
    let eth = h.asset("ETH");
    let usdc = h.asset("USDC");
    h.ledger.set_balance(&eth.erc20_address, 111);
    h.ledger.set_balance(&usdc.erc20_address, 222);
    h.session.login().await.unwrap();

    let gate = h.ledger.gate(&eth.erc20_address);
    let slow = {
        let session = h.session.clone();
        tokio::spawn(async move { session.select_asset("ETH").await })
    };
    let reads = h.ledger.reads.load(Ordering::SeqCst);
    let ledger = h.ledger.clone();
    wait_until(|| {
        let ledger = ledger.clone();
        async move { ledger.reads.load(Ordering::SeqCst) > reads }
    })
    .await;

    h.session.select_asset("USDC").await.unwrap();
    gate.open();
    slow.await.unwrap().unwrap();

    let snap = h.session.snapshot().await;
    assert_eq!(snap.asset, "USDC");
    assert_eq!(snap.public, Amount::from(222u64));
    assert!(!snap.loading);
}

#[tokio::test]
async fn one_action_at_a_time() {
    let h = Harness::new();
    h.factory.set_state("STRK", 0, 5);
    h.session.login().await.unwrap();

    let gate = Gate::closed();
    *h.signer.confirm_gate.lock().unwrap() = Some(gate.clone());

    let first = {
        let session = h.session.clone();
        tokio::spawn(async move { session.sync().await })
    };

    let session = h.session.clone();
    wait_until(|| {
        let session = session.clone();
        async move {
            session
                .current_action()
                .await
                .map(|r| r.status == ActionStatus::AwaitingConfirmation)
                .unwrap_or(false)
        }
    })
    .await;
    assert!(h.session.is_syncing().await);

    let err = h.session.sync().await.unwrap_err();
    assert!(matches!(err, ArcanaError::ActionInProgress(_)));

    gate.open();
    let record = first.await.unwrap().unwrap();
    assert_eq!(record.status, ActionStatus::Settled);
    assert!(!h.session.is_syncing().await);
    assert_eq!(h.signer.executed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_action_frees_the_slot() {
    let h = Harness::new();
    h.factory.set_state("STRK", 0, 5);
    h.session.login().await.unwrap();

    let gate = Gate::closed();
    *h.signer.confirm_gate.lock().unwrap() = Some(gate.clone());

    let first = {
        let session = h.session.clone();
        tokio::spawn(async move { session.sync().await })
    };

    let session = h.session.clone();
    wait_until(|| {
        let session = session.clone();
        async move {
            session
                .current_action()
                .await
                .map(|r| r.status == ActionStatus::AwaitingConfirmation)
                .unwrap_or(false)
        }
    })
    .await;

    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());

    let cancelled = h.session.current_action().await.unwrap();
    assert_eq!(cancelled.status, ActionStatus::Failed);
    assert!(!h.session.is_syncing().await);

    gate.open();
    let record = h.session.sync().await.unwrap();
    assert_eq!(record.status, ActionStatus::Settled);
    assert_ne!(record.id, cancelled.id);
    assert_eq!(h.signer.executed.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn poller_refreshes_until_stopped() {
    let h = Harness::new();
    let poller = h.session.start_polling(Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(35)).await;
    let reads = h.ledger.reads.load(Ordering::SeqCst);
    assert_eq!(reads, 4);

    drop(poller);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.ledger.reads.load(Ordering::SeqCst), reads);
}
