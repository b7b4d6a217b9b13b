//! Arcana - Tongo Shielded Wallet Client
//!
//! Client-side core of a shielded-balance wallet on Starknet. The wallet
//! signer, the Tongo cryptography and the presentation layer are external;
//! this crate owns what sits between them:
//!
//! 1. **Identity** - deterministic Tongo key from a wallet login signature
//! 2. **Shielded accounts** - one handle per (identity, asset), rebuilt on change
//! 3. **Balances** - public / private / pending reconciliation with stale-write protection
//! 4. **Actions** - shield, unshield and sync as single atomic multicalls
//!
//! ```rust,ignore
//! let session = Arc::new(WalletSession::new(registry, network, signer, factory, ledger, options)?);
//! session.login().await?;
//! let poller = session.start_polling(Duration::from_secs(10));
//! session.shield("1.0").await?;
//! ```

pub mod common;
pub mod identity;
pub mod ledger;
pub mod orchestrator;
pub mod reconciler;
pub mod session;
pub mod shielded;
pub mod signer;
pub mod types;

// Re-exports: infrastructure
pub use common::{ArcanaConfig, ArcanaError, ConfigError, Network, Result};

// Re-exports: identity
pub use identity::{Identity, IdentityDeriver, IdentityError, TypedData, WalletSignature};

// Re-exports: boundaries
pub use ledger::{BalanceLimbs, LedgerError, LedgerReader, NetworkHandle};
pub use shielded::{
    AccountState, OperationDescriptor, OperationKind, ShieldedAccount, ShieldedAccountFactory,
    ShieldedAccountHandle, ShieldedError,
};
pub use signer::{Call, SignerError, TxHandle, TxOutcome, WalletSigner};

// Re-exports: services
pub use orchestrator::{ActionError, CallBuilder, TransactionOrchestrator};
pub use reconciler::{BalanceReconciler, FetchContext, PollerHandle};
pub use session::{SessionOptions, WalletSession};

// Re-exports: types
pub use types::{
    ActionKind, ActionRecord, ActionStatus, Amount, Asset, AssetRegistry, BalanceSnapshot,
    FetchOutcome, PendingAction,
};
