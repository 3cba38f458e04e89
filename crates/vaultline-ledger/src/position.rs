//! Per-(user, strategy) positions.
//!
//! A position remembers the accumulator value at its last settlement. On
//! every touch the reward owed since then is folded into
//! `accrued_rewards` and the checkpoint moves forward, so the position only
//! ever earns on shares it held over the interval.

use serde::{Deserialize, Serialize};
use vaultline_types::Amount;

use crate::math;
use crate::{LedgerError, Result};

/// One user's stake in one strategy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    /// Base-asset principal currently deposited, excluding rewards.
    pub principal: Amount,
    /// Claim on the strategy's pool.
    pub shares: u128,
    /// Strategy accumulator as of the last settlement.
    pub checkpoint_acc: u128,
    /// Settled but unclaimed rewards.
    pub accrued_rewards: Amount,
    /// Rewards paid out to date.
    pub claimed_rewards: Amount,
}

impl UserPosition {
    /// Create an empty position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reward owed since the last checkpoint at accumulator value `acc`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn pending(&self, acc: u128) -> Result<Amount> {
        if self.shares == 0 {
            return Ok(0);
        }
        math::reward_for(acc.saturating_sub(self.checkpoint_acc), self.shares)
    }

    /// Fold the pending reward into `accrued_rewards` and checkpoint at `acc`.
    ///
    /// Returns the amount settled.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn settle(&mut self, acc: u128) -> Result<Amount> {
        let pending = self.pending(acc)?;
        self.accrued_rewards = self
            .accrued_rewards
            .checked_add(pending)
            .ok_or(LedgerError::Overflow)?;
        self.checkpoint_acc = acc;
        Ok(pending)
    }

    /// Accrued plus pending reward at `acc`, without settling.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn reward_balance(&self, acc: u128) -> Result<Amount> {
        self.accrued_rewards
            .checked_add(self.pending(acc)?)
            .ok_or(LedgerError::Overflow)
    }

    /// Add `amount` of principal backed by `shares`.
    ///
    /// The position must already be settled at the current accumulator.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn add_principal(&mut self, amount: Amount, shares: u128) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let principal = self
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let total = self.shares.checked_add(shares).ok_or(LedgerError::Overflow)?;
        self.principal = principal;
        self.shares = total;
        Ok(())
    }

    /// Remove `amount` of principal and burn the proportional shares.
    ///
    /// Burns `amount * shares / principal` (measured before the reduction),
    /// or every share when the whole principal leaves. Returns the shares
    /// burned.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::InsufficientPrincipal`] if `amount` exceeds the principal
    pub fn remove_principal(&mut self, amount: Amount) -> Result<u128> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > self.principal {
            return Err(LedgerError::InsufficientPrincipal {
                requested: amount,
                available: self.principal,
            });
        }
        let burned = if amount == self.principal {
            self.shares
        } else {
            math::mul_div(amount, self.shares, self.principal)?
        };
        self.principal -= amount;
        self.shares -= burned;
        Ok(burned)
    }

    /// Take every accrued reward for payout.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NothingToClaim`] if nothing has accrued
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn take_rewards(&mut self) -> Result<Amount> {
        let amount = self.accrued_rewards;
        if amount == 0 {
            return Err(LedgerError::NothingToClaim);
        }
        self.claimed_rewards = self
            .claimed_rewards
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.accrued_rewards = 0;
        Ok(amount)
    }

    /// Whether the position holds nothing and is owed nothing.
    pub fn is_empty(&self) -> bool {
        self.principal == 0 && self.shares == 0 && self.accrued_rewards == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultline_types::ACC_PRECISION;

    #[test]
    fn test_settle_accrues_and_checkpoints() {
        let mut pos = UserPosition::new();
        pos.add_principal(1000, 1000).expect("add");

        // 0.01 reward per share.
        let acc = ACC_PRECISION / 100;
        assert_eq!(pos.settle(acc).expect("settle"), 10);
        assert_eq!(pos.accrued_rewards, 10);
        assert_eq!(pos.checkpoint_acc, acc);

        // Settling again at the same accumulator adds nothing.
        assert_eq!(pos.settle(acc).expect("settle"), 0);
        assert_eq!(pos.accrued_rewards, 10);
    }

    #[test]
    fn test_zero_shares_never_accrue() {
        let mut pos = UserPosition::new();
        assert_eq!(pos.settle(ACC_PRECISION * 5).expect("settle"), 0);
        assert_eq!(pos.accrued_rewards, 0);
    }

    #[test]
    fn test_late_entrant_checkpoint_excludes_past_rewards() {
        let acc_at_entry = ACC_PRECISION / 10;
        let mut pos = UserPosition::new();
        pos.settle(acc_at_entry).expect("settle");
        pos.add_principal(500, 500).expect("add");
        assert_eq!(pos.pending(acc_at_entry).expect("pending"), 0);
        assert_eq!(
            pos.pending(acc_at_entry + ACC_PRECISION / 100)
                .expect("pending"),
            5
        );
    }

    #[test]
    fn test_remove_principal_proportional_burn() {
        let mut pos = UserPosition::new();
        pos.add_principal(1000, 1000).expect("add");
        assert_eq!(pos.remove_principal(250).expect("remove"), 250);
        assert_eq!(pos.principal, 750);
        assert_eq!(pos.shares, 750);

        let err = pos.remove_principal(751).expect_err("too much");
        assert_eq!(
            err,
            LedgerError::InsufficientPrincipal {
                requested: 751,
                available: 750
            }
        );

        assert_eq!(pos.remove_principal(750).expect("remove all"), 750);
        assert_eq!(pos.shares, 0);
    }

    #[test]
    fn test_take_rewards() {
        let mut pos = UserPosition::new();
        assert_eq!(pos.take_rewards(), Err(LedgerError::NothingToClaim));

        pos.add_principal(100, 100).expect("add");
        pos.settle(ACC_PRECISION).expect("settle");
        assert_eq!(pos.take_rewards().expect("take"), 100);
        assert_eq!(pos.accrued_rewards, 0);
        assert_eq!(pos.claimed_rewards, 100);
        assert_eq!(pos.take_rewards(), Err(LedgerError::NothingToClaim));
    }

    #[test]
    fn test_reward_balance_is_view() {
        let mut pos = UserPosition::new();
        pos.add_principal(100, 100).expect("add");
        pos.accrued_rewards = 7;
        let before = pos.clone();
        assert_eq!(pos.reward_balance(ACC_PRECISION).expect("view"), 107);
        assert_eq!(pos, before);
    }

    #[test]
    fn test_is_empty() {
        let mut pos = UserPosition::new();
        assert!(pos.is_empty());
        pos.add_principal(1, 1).expect("add");
        assert!(!pos.is_empty());
        pos.remove_principal(1).expect("remove");
        assert!(pos.is_empty());
    }
}
