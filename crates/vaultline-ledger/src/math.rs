//! Fixed-point accumulator arithmetic.
//!
//! The accumulator stores cumulative reward per share scaled by
//! [`ACC_PRECISION`]. All operations are checked; every rounding step
//! floors, so the sum of what positions can claim never exceeds what was
//! credited.

use vaultline_types::{wide, Amount, ACC_PRECISION};

use crate::{LedgerError, Result};

/// `a * b / c`, floored, with a 256-bit intermediate.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] if the quotient overflows or `c` is zero
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    wide::mul_div(a, b, c).ok_or(LedgerError::Overflow)
}

/// Reward owed to `shares` for an accumulator move of `acc_delta`.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn reward_for(acc_delta: u128, shares: u128) -> Result<Amount> {
    mul_div(acc_delta, shares, ACC_PRECISION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultline_types::units::tokens;

    #[test]
    fn test_mul_div() {
        assert_eq!(mul_div(10, 3, 4).expect("mul_div"), 7);
        assert!(mul_div(1, 1, 0).is_err());
        assert!(mul_div(u128::MAX, 2, 1).is_err());
        assert_eq!(
            mul_div(tokens(600), tokens(1000), tokens(1000)).expect("wide"),
            tokens(600)
        );
    }

    #[test]
    fn test_reward_for_exact_when_divisible() {
        // 10 tokens over 2000 shares is 0.005 per share.
        let acc_delta = mul_div(tokens(10), ACC_PRECISION, tokens(2000)).expect("delta");
        assert_eq!(reward_for(acc_delta, tokens(1000)).expect("reward"), tokens(5));
        assert_eq!(reward_for(acc_delta, tokens(2000)).expect("reward"), tokens(10));
    }

    #[test]
    fn test_reward_for_floors() {
        let acc_delta = mul_div(1, ACC_PRECISION, 3).expect("delta");
        assert_eq!(acc_delta, 333_333_333_333);
        assert_eq!(reward_for(acc_delta, 3).expect("reward"), 0);
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        // A million tokens of growth over a thousand-token pool.
        let acc_delta = mul_div(tokens(1_000_000), ACC_PRECISION, tokens(1000)).expect("delta");
        let reward = reward_for(acc_delta, tokens(1000)).expect("reward");
        assert_eq!(reward, tokens(1_000_000));
    }
}
