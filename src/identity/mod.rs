//! Identity Derivation
//!
//! Turns a wallet signature over a fixed login message into a deterministic
//! Tongo private key. The same wallet account on the same chain always
//! derives the same key, so no separate key storage is needed.

pub mod deriver;
pub mod message;
pub mod signature;

pub use deriver::{
    derive_private_key, derive_seed, grind_key, seed_bytes, Identity, IdentityDeriver,
    MAX_GRIND_ATTEMPTS, STARK_CURVE_ORDER,
};
pub use message::{TypedData, TypedDomain, TypeMember, LOGIN_ACTION, LOGIN_DOMAIN_NAME};
pub use signature::{parse_scalar, SignaturePair, WalletSignature};

use crate::signer::SignerError;

/// Identity derivation errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("signer error: {0}")]
    Signer(#[from] SignerError),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("key derivation failed: {0}")]
    Derivation(String),
}
