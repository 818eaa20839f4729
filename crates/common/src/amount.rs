//! # Fixed-Point Token Amounts
//!
//! Every balance in the ledger is a `u128` denominated in smallest on-chain
//! units with 8 fractional decimal digits. `1.0` token is [`SCALE`] units.
//!
//! All arithmetic is exact integer arithmetic; there is no floating point
//! anywhere in the ledger. Multiplication and division truncate toward zero
//! at the 8th decimal place, which is the rounding rule the reward payout
//! is verified against.
//!
//! The helpers here are pure functions. Operands are ledger amounts bounded
//! by the token supply, so intermediate products stay far below `u128::MAX`
//! (two operands of up to ~10^18 whole tokens each still fit).

/// Number of smallest units in one whole token (8 decimals).
pub const SCALE: u128 = 100_000_000;

/// Amount in smallest on-chain units (8 decimals).
pub type Amount = u128;

/// Converts a whole-token count into smallest units.
pub const fn tokens(whole: u128) -> Amount {
    whole * SCALE
}

/// Fixed-point multiply: `a * b`, truncated to 8 decimals.
///
/// Used for `staked × scale` and `reward × cut`, where one operand is a
/// fraction of 1.0 expressed in [`SCALE`] units.
pub const fn fix_mul(a: Amount, b: Amount) -> Amount {
    a * b / SCALE
}

/// Fixed-point divide: `a / b`, truncated to 8 decimals.
///
/// The caller is responsible for `b != 0`; the one ledger call site
/// (the reward scale) skips the division entirely when the denominator
/// is zero.
pub const fn fix_div(a: Amount, b: Amount) -> Amount {
    a * SCALE / b
}

/// `true` iff `value` is a valid fraction of 1.0 (i.e. `<= SCALE`).
///
/// Cut percentages and reward ratios are fractions in [`SCALE`] units:
/// `0.08` is `8_000_000`.
pub const fn is_fraction(value: Amount) -> bool {
    value <= SCALE
}
