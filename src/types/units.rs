//! Unit Conversion Utilities
//!
//! Helpers for decimal input parsing, fixed-point display and the
//! public-token <-> shielded-unit conversion.
//!
//! Public amounts are integers scaled by the token's `decimals`. Shielded
//! amounts are integers in the protocol's own unit; one shielded unit is worth
//! `rate` public units.

use primitive_types::U256;

/// Fixed-point integer amount (token base units or shielded units)
pub type Amount = U256;

/// Fractional digits kept when rendering a balance
pub const DISPLAY_FRACTION_DIGITS: usize = 3;

/// Largest scale whose unit (`10^decimals`) fits in 256 bits
pub const MAX_DECIMALS: u32 = 77;

/// Parse a decimal string into a fixed-point integer scaled by `decimals`.
///
/// Empty or malformed input yields zero. A fraction longer than `decimals` is
/// truncated, a shorter one is zero-padded. Callers must reject a zero result
/// themselves before acting on it.
pub fn parse_decimal(input: &str, decimals: u32) -> Amount {
    try_parse_decimal(input, decimals).unwrap_or_default()
}

fn try_parse_decimal(input: &str, decimals: u32) -> Option<Amount> {
    let input = input.trim();
    if input.is_empty() || decimals > MAX_DECIMALS {
        return None;
    }

    let (integer, fraction) = input.split_once('.').unwrap_or((input, ""));

    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let decimals = decimals as usize;
    let mut digits = String::with_capacity(integer.len() + decimals);
    digits.push_str(integer);
    digits.extend(fraction.chars().take(decimals));
    for _ in fraction.len().min(decimals)..decimals {
        digits.push('0');
    }

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some(Amount::zero());
    }

    Amount::from_dec_str(digits).ok()
}

/// Render a fixed-point integer with at most three fractional digits.
///
/// Zero renders as `"0.00"`. The fraction is truncated, never rounded.
pub fn format_amount(amount: Amount, decimals: u32) -> String {
    if amount.is_zero() {
        return "0.00".to_string();
    }

    let decimals = decimals as usize;
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let shown = &fraction[..fraction.len().min(DISPLAY_FRACTION_DIGITS)];

    format!("{}.{}", integer, shown)
}

/// Convert a public-token amount into shielded units (`public / rate`).
///
/// Truncates toward zero. Registries reject a zero rate at load time; should
/// one slip through, the result is zero rather than a panic.
pub fn to_shielded_units(public_amount: Amount, rate: Amount) -> Amount {
    public_amount.checked_div(rate).unwrap_or_default()
}

/// Convert shielded units back to public-token units (`shielded * rate`)
pub fn to_public_units(shielded_amount: Amount, rate: Amount) -> Amount {
    shielded_amount.saturating_mul(rate)
}

/// Combine a Cairo `u256` (low, high) limb pair: `low + (high << 128)`
pub fn combine_limbs(low: u128, high: u128) -> Amount {
    Amount::from(low) + (Amount::from(high) << 128)
}

/// Split an amount into Cairo `u256` (low, high) limbs
pub fn split_limbs(amount: Amount) -> (u128, u128) {
    let low = amount.low_u128();
    let high = (amount >> 128).low_u128();
    (low, high)
}

/// Shorten an address for display, e.g. `0x0471...938d`
pub fn truncate_address(address: &str) -> String {
    if address.len() <= 10 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Serde adapter storing amounts as decimal strings
pub mod serde_decimal {
    use super::Amount;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        Amount::from_dec_str(s.trim())
            .map_err(|e| D::Error::custom(format!("invalid decimal amount {:?}: {:?}", s, e)))
    }
}
