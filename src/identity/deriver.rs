//! Key Derivation
//!
//! Derives the Tongo private key from a login signature:
//!
//! ```text
//! signature (r, s)
//!     └── seed = Poseidon(r, s)                      Stark field hash
//!         └── key = grind_key(seed)                  SHA-256 rejection sampling
//!             └── Identity { key, public_key }       session memory only
//! ```
//!
//! Both steps are pinned. Swapping the hash or the grinding scheme changes
//! every user's derived key.

use primitive_types::U256;
use sha2::{Digest, Sha256};
use starknet_crypto::{get_public_key, poseidon_hash, Felt};

use super::message::TypedData;
use super::signature::SignaturePair;
use super::IdentityError;
use crate::signer::WalletSigner;

/// Order of the Stark curve group
pub const STARK_CURVE_ORDER: U256 = U256([
    0x1e66a241adc64d2f,
    0xb781126dcae7b232,
    0xffffffffffffffff,
    0x0800000000000010,
]);

/// Grinding gives up after this many digests
pub const MAX_GRIND_ATTEMPTS: u64 = 100_000;

/// A session identity: the derived Tongo key pair
///
/// Lives only in memory; `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    private_key: Felt,
    public_key: Felt,
}

impl Identity {
    pub fn from_private_key(private_key: Felt) -> Result<Self, IdentityError> {
        if private_key == Felt::ZERO {
            return Err(IdentityError::Derivation("zero private key".to_string()));
        }
        Ok(Self {
            public_key: get_public_key(&private_key),
            private_key,
        })
    }

    /// Secret scalar, for shielded-account construction only
    pub fn private_key(&self) -> &Felt {
        &self.private_key
    }

    /// Stark public key (x coordinate)
    pub fn public_key(&self) -> Felt {
        self.public_key
    }

    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex_string()
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Poseidon hash of the two signature scalars
pub fn derive_seed(pair: &SignaturePair) -> Felt {
    poseidon_hash(pair.r, pair.s)
}

/// Minimal big-endian bytes of a felt (at least one byte)
pub fn seed_bytes(seed: &Felt) -> Vec<u8> {
    let bytes = seed.to_bytes_be();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Map arbitrary seed bytes to a valid Stark private key.
///
/// Hashes `seed || be(i)` for i = 0, 1, ... and accepts the first digest below
/// the largest multiple of the curve order that fits in 256 bits, then reduces
/// it modulo the order. Rejection keeps the result uniform.
pub fn grind_key(seed: &[u8]) -> Result<Felt, IdentityError> {
    let order = STARK_CURVE_ORDER;
    // 2^256 mod n, computed without leaving 256 bits
    let wrap = (U256::MAX % order + U256::one()) % order;
    let max_accepted = U256::MAX - wrap;

    for i in 0..MAX_GRIND_ATTEMPTS {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(index_bytes(i));
        let digest: [u8; 32] = hasher.finalize().into();

        let candidate = U256::from_big_endian(&digest);
        if candidate <= max_accepted {
            let mut key = [0u8; 32];
            (candidate % order).to_big_endian(&mut key);
            return Ok(Felt::from_bytes_be(&key));
        }
    }

    Err(IdentityError::Derivation(format!(
        "no key below limit after {} attempts",
        MAX_GRIND_ATTEMPTS
    )))
}

/// Big-endian bytes of `i` without leading zeros (zero encodes as one byte)
fn index_bytes(i: u64) -> Vec<u8> {
    let bytes = i.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Full pipeline: signature pair -> private key
pub fn derive_private_key(pair: &SignaturePair) -> Result<Felt, IdentityError> {
    let seed = derive_seed(pair);
    grind_key(&seed_bytes(&seed))
}

/// Turns a wallet login signature into a session identity
#[derive(Debug, Clone)]
pub struct IdentityDeriver {
    chain_id: String,
}

impl IdentityDeriver {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// The payload the wallet is asked to sign
    pub fn login_message(&self) -> TypedData {
        TypedData::login(&self.chain_id)
    }

    /// Ask the wallet for the login signature and derive the identity.
    ///
    /// Nothing is committed anywhere; the caller decides whether to replace
    /// its current identity with the result.
    pub async fn login(&self, signer: &dyn WalletSigner) -> Result<Identity, IdentityError> {
        let message = self.login_message();
        let signature = signer.sign_typed_data(&message).await?;

        let pair = signature.to_pair()?;
        let private_key = derive_private_key(&pair)?;

        Identity::from_private_key(private_key)
    }
}
