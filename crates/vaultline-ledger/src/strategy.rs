//! Per-strategy reward ledger.
//!
//! The ledger never trusts an external "reward amount". It diffs the
//! strategy's redeemable balance against its own high-water mark
//! (`last_known_balance`) and credits the growth to the reward-per-share
//! accumulator. Principal flows and payouts move the mark in lockstep so
//! they are never mistaken for yield.
//!
//! ## Losses
//!
//! A balance below the mark is recorded as `unrecovered_loss` and absorbed:
//! the accumulator never decreases, and new growth is only credited once
//! the balance is back above the mark.

use serde::{Deserialize, Serialize};
use vaultline_types::{wide, Amount, StrategyId, ACC_PRECISION};

use crate::math;
use crate::{LedgerError, Result};

/// What a refresh did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Growth was credited to the accumulator.
    Distributed {
        /// Amount credited to shareholders.
        amount: Amount,
        /// Accumulator increment.
        acc_delta: u128,
    },
    /// No growth since the last refresh.
    Unchanged,
    /// The balance is below the high-water mark.
    Loss {
        /// Shortfall against the mark.
        unrecovered_loss: Amount,
    },
    /// Growth arrived while no shares were outstanding.
    NoShares {
        /// Growth set aside as unallocated.
        unallocated: Amount,
    },
}

/// Aggregate accounting for one strategy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyLedger {
    strategy: StrategyId,
    total_principal: Amount,
    total_shares: u128,
    reward_acc_per_share: u128,
    last_known_balance: Amount,
    unrecovered_loss: Amount,
    total_distributed: Amount,
    total_claimed: Amount,
    unallocated: Amount,
    /// Scaled reward not yet expressible as a whole accumulator step.
    carry: u128,
}

impl StrategyLedger {
    /// Create an empty ledger for `strategy`.
    pub fn new(strategy: StrategyId) -> Self {
        Self {
            strategy,
            total_principal: 0,
            total_shares: 0,
            reward_acc_per_share: 0,
            last_known_balance: 0,
            unrecovered_loss: 0,
            total_distributed: 0,
            total_claimed: 0,
            unallocated: 0,
            carry: 0,
        }
    }

    /// Strategy this ledger accounts for.
    pub fn strategy(&self) -> StrategyId {
        self.strategy
    }

    /// Sum of all positions' principal.
    pub fn total_principal(&self) -> Amount {
        self.total_principal
    }

    /// Sum of all positions' shares.
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Cumulative reward per share since genesis, scaled by `ACC_PRECISION`.
    pub fn reward_acc_per_share(&self) -> u128 {
        self.reward_acc_per_share
    }

    /// High-water mark of the redeemable balance.
    pub fn last_known_balance(&self) -> Amount {
        self.last_known_balance
    }

    /// Shortfall of the last observed balance against the mark.
    pub fn unrecovered_loss(&self) -> Amount {
        self.unrecovered_loss
    }

    /// Total reward ever credited to shareholders.
    pub fn total_distributed(&self) -> Amount {
        self.total_distributed
    }

    /// Total reward ever paid out.
    pub fn total_claimed(&self) -> Amount {
        self.total_claimed
    }

    /// Growth observed while no shares were outstanding.
    pub fn unallocated(&self) -> Amount {
        self.unallocated
    }

    /// Fold the growth in `observed` (the strategy's current redeemable
    /// balance) into the accumulator.
    ///
    /// The remainder of the fixed-point division is carried into the next
    /// refresh. Calling this twice with the same balance leaves the
    /// accumulator unchanged the second time.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn refresh(&mut self, observed: Amount) -> Result<RefreshOutcome> {
        if observed < self.last_known_balance {
            let shortfall = self.last_known_balance - observed;
            if shortfall != self.unrecovered_loss {
                tracing::warn!(
                    strategy = %self.strategy,
                    shortfall,
                    mark = self.last_known_balance,
                    observed,
                    "ledger: redeemable balance below high-water mark"
                );
            }
            self.unrecovered_loss = shortfall;
            return Ok(RefreshOutcome::Loss {
                unrecovered_loss: shortfall,
            });
        }
        self.unrecovered_loss = 0;

        let growth = observed - self.last_known_balance;
        if growth == 0 {
            return Ok(RefreshOutcome::Unchanged);
        }

        if self.total_shares == 0 {
            self.unallocated = self
                .unallocated
                .checked_add(growth)
                .ok_or(LedgerError::Overflow)?;
            self.last_known_balance = observed;
            tracing::debug!(strategy = %self.strategy, growth, "ledger: growth with no shares outstanding");
            return Ok(RefreshOutcome::NoShares {
                unallocated: growth,
            });
        }

        // (growth * ACC_PRECISION + carry) / total_shares, keeping the
        // remainder so flooring never loses reward.
        let shares = self.total_shares;
        let (quotient, rem) =
            wide::mul_div_rem(growth, ACC_PRECISION, shares).ok_or(LedgerError::Overflow)?;
        let (carry_quotient, carry_rem) = (self.carry / shares, self.carry % shares);
        let mut acc_delta = quotient
            .checked_add(carry_quotient)
            .ok_or(LedgerError::Overflow)?;
        let carry = if rem >= shares - carry_rem {
            acc_delta = acc_delta.checked_add(1).ok_or(LedgerError::Overflow)?;
            rem - (shares - carry_rem)
        } else {
            rem + carry_rem
        };

        let acc = self
            .reward_acc_per_share
            .checked_add(acc_delta)
            .ok_or(LedgerError::Overflow)?;
        let distributed = self
            .total_distributed
            .checked_add(growth)
            .ok_or(LedgerError::Overflow)?;

        self.reward_acc_per_share = acc;
        self.total_distributed = distributed;
        self.carry = carry;
        self.last_known_balance = observed;

        tracing::trace!(
            strategy = %self.strategy,
            growth,
            acc_delta,
            carry,
            acc,
            "ledger: refreshed"
        );

        Ok(RefreshOutcome::Distributed {
            amount: growth,
            acc_delta,
        })
    }

    /// Accumulator value a refresh at `observed` would produce, without
    /// mutating the ledger.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn preview_acc(&self, observed: Amount) -> Result<u128> {
        let mut staged = self.clone();
        staged.refresh(observed)?;
        Ok(staged.reward_acc_per_share)
    }

    /// Shares minted for a new deposit of `amount`.
    ///
    /// The first deposit sets a 1:1 baseline; later deposits are priced
    /// against aggregate principal. Rewards live in the accumulator and never
    /// compound into principal, so this stays 1:1.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn shares_for(&self, amount: Amount) -> Result<u128> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if self.total_shares == 0 || self.total_principal == 0 {
            return Ok(amount);
        }
        math::mul_div(amount, self.total_shares, self.total_principal)
    }

    /// Record `amount` of principal (and its `shares`) entering the strategy.
    ///
    /// Raises the mark by `amount` so the deposit is not read as yield.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn deposit_principal(&mut self, amount: Amount, shares: u128) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let principal = self
            .total_principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or(LedgerError::Overflow)?;
        let mark = self
            .last_known_balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.total_principal = principal;
        self.total_shares = total_shares;
        self.last_known_balance = mark;
        Ok(())
    }

    /// Record `amount` of principal (and its `shares`) leaving the strategy.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::InsufficientStrategyBalance`] if the strategy tracks
    ///   less principal or fewer shares than requested
    pub fn withdraw_principal(&mut self, amount: Amount, shares: u128) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        if amount > self.total_principal {
            return Err(LedgerError::InsufficientStrategyBalance {
                requested: amount,
                available: self.total_principal,
            });
        }
        if shares > self.total_shares {
            return Err(LedgerError::InsufficientStrategyBalance {
                requested: shares,
                available: self.total_shares,
            });
        }
        self.total_principal -= amount;
        self.total_shares -= shares;
        self.last_known_balance = self.last_known_balance.saturating_sub(amount);
        Ok(())
    }

    /// Record `amount` of accrued reward paid out of the strategy.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Overflow`] on arithmetic overflow
    pub fn record_payout(&mut self, amount: Amount) -> Result<()> {
        self.total_claimed = self
            .total_claimed
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.last_known_balance = self.last_known_balance.saturating_sub(amount);
        Ok(())
    }
}
