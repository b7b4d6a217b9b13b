//! Shared Types Module
//!
//! Data types shared across the Arcana client.

pub mod action;
pub mod asset;
pub mod balance;
pub mod units;

// Re-exports for convenience
pub use action::{ActionKind, ActionRecord, ActionStatus, PendingAction};
pub use asset::{is_valid_address, mainnet_assets, Asset, AssetRegistry, RegistryError};
pub use balance::{BalanceSnapshot, FetchOutcome};
pub use units::{
    combine_limbs, format_amount, parse_decimal, split_limbs, to_public_units, to_shielded_units,
    truncate_address, Amount,
};
