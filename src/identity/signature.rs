//! Signature Encodings
//!
//! Wallets return Stark signatures either as a flat array (`[r, s, ...]`) or
//! as an object with named fields (`{ r, s }`). Both reduce to one pair.

use serde::{Deserialize, Serialize};
use starknet_crypto::Felt;

use super::IdentityError;

/// Signature exactly as returned by a wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WalletSignature {
    /// `[r, s, ...]`; extra trailing elements are ignored
    Array(Vec<String>),
    /// `{ "r": ..., "s": ... }`
    Named { r: String, s: String },
}

/// The two signature scalars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignaturePair {
    pub r: Felt,
    pub s: Felt,
}

impl WalletSignature {
    pub fn pair(r: impl Into<String>, s: impl Into<String>) -> Self {
        Self::Named {
            r: r.into(),
            s: s.into(),
        }
    }

    /// Extract `(r, s)` from whichever encoding the wallet used
    pub fn to_pair(&self) -> Result<SignaturePair, IdentityError> {
        let (r, s) = match self {
            Self::Array(parts) => match parts.as_slice() {
                [r, s, ..] => (r, s),
                _ => {
                    return Err(IdentityError::MalformedSignature(format!(
                        "expected at least 2 elements, got {}",
                        parts.len()
                    )))
                }
            },
            Self::Named { r, s } => (r, s),
        };

        Ok(SignaturePair {
            r: parse_scalar(r)?,
            s: parse_scalar(s)?,
        })
    }
}

/// Parse a felt given as `0x` hex or decimal
pub fn parse_scalar(value: &str) -> Result<Felt, IdentityError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(IdentityError::MalformedSignature("empty scalar".to_string()));
    }

    let parsed = if value.starts_with("0x") || value.starts_with("0X") {
        Felt::from_hex(value)
    } else {
        Felt::from_dec_str(value)
    };

    parsed.map_err(|e| IdentityError::MalformedSignature(format!("{}: {}", value, e)))
}
