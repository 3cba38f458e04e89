//! Pooled share book.
//!
//! Both in-memory sources hold one pooled reserve of the base asset and
//! track each owner's claim on it in shares, the way a staking pool or an
//! LP token does. Growth of the reserve raises every owner's redeemable
//! value pro rata without touching the book.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vaultline_types::{wide, Address, Amount};

use crate::asset::BaseAsset;
use crate::{Result, SourceError};

/// Per-owner shares of a pooled reserve.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShareBook {
    shares: BTreeMap<Address, u128>,
    total_shares: u128,
}

impl ShareBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shares held by `owner`.
    pub fn shares_of(&self, owner: &Address) -> u128 {
        self.shares.get(owner).copied().unwrap_or(0)
    }

    /// Total shares outstanding.
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Shares minted for adding `amount` to a reserve worth `pool_before`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Overflow`] on arithmetic overflow
    pub fn shares_for_deposit(&self, amount: Amount, pool_before: Amount) -> Result<u128> {
        if self.total_shares == 0 || pool_before == 0 {
            return Ok(amount);
        }
        wide::mul_div(amount, self.total_shares, pool_before).ok_or(SourceError::Overflow)
    }

    /// Shares that must be burned to pay out `amount` from a reserve worth `pool`.
    ///
    /// Rounds up so a payout never leaves the remaining owners short.
    ///
    /// # Errors
    ///
    /// - [`SourceError::InsufficientLiquidity`] if the pool is empty
    /// - [`SourceError::Overflow`] on arithmetic overflow
    pub fn shares_for_withdrawal(&self, amount: Amount, pool: Amount) -> Result<u128> {
        if pool == 0 {
            return Err(SourceError::InsufficientLiquidity {
                requested: amount,
                available: 0,
            });
        }
        wide::mul_div_ceil(amount, self.total_shares, pool).ok_or(SourceError::Overflow)
    }

    /// Value of `owner`'s shares in a reserve worth `pool`, floored.
    pub fn redeemable(&self, owner: &Address, pool: Amount) -> Amount {
        let held = self.shares_of(owner);
        if held == 0 || self.total_shares == 0 {
            return 0;
        }
        if held == self.total_shares {
            return pool;
        }
        // held < total_shares, so the quotient is below pool.
        wide::mul_div(held, pool, self.total_shares).unwrap_or(pool)
    }

    /// Credit `shares` to `owner`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Overflow`] on arithmetic overflow
    pub fn mint(&mut self, owner: &Address, shares: u128) -> Result<()> {
        let total = self
            .total_shares
            .checked_add(shares)
            .ok_or(SourceError::Overflow)?;
        let held = self
            .shares_of(owner)
            .checked_add(shares)
            .ok_or(SourceError::Overflow)?;
        self.shares.insert(*owner, held);
        self.total_shares = total;
        Ok(())
    }

    /// Remove `shares` from `owner`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Overflow`] if `owner` holds fewer shares
    pub fn burn(&mut self, owner: &Address, shares: u128) -> Result<()> {
        let held = self.shares_of(owner);
        let remaining = held.checked_sub(shares).ok_or(SourceError::Overflow)?;
        if remaining == 0 {
            self.shares.remove(owner);
        } else {
            self.shares.insert(*owner, remaining);
        }
        self.total_shares -= shares;
        Ok(())
    }

    /// Move `amount` from `owner` into the reserve at `reserve` and mint
    /// the matching shares.
    ///
    /// Shares are priced against the reserve before the transfer. Nothing
    /// changes if the transfer fails.
    ///
    /// # Errors
    ///
    /// - [`SourceError::ZeroAmount`] if `amount` is zero
    /// - [`SourceError::TransferFailed`] if `owner` lacks the balance
    pub fn deposit_into(
        &mut self,
        asset: &mut dyn BaseAsset,
        reserve: &Address,
        owner: &Address,
        amount: Amount,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(SourceError::ZeroAmount);
        }
        let pool_before = asset.balance_of(reserve);
        let minted = self.shares_for_deposit(amount, pool_before)?;
        asset.transfer(owner, reserve, amount)?;
        self.mint(owner, minted)?;
        Ok(minted)
    }

    /// Pay `amount` of `owner`'s value out of the reserve to `recipient`.
    ///
    /// `exit_cap` bounds a single payout independently of what `owner`
    /// holds. Nothing changes on failure.
    ///
    /// # Errors
    ///
    /// - [`SourceError::ZeroAmount`] if `amount` is zero
    /// - [`SourceError::InsufficientLiquidity`] if `owner`'s value or the
    ///   exit cap is below `amount`
    pub fn withdraw_from(
        &mut self,
        asset: &mut dyn BaseAsset,
        reserve: &Address,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
        exit_cap: Amount,
    ) -> Result<u128> {
        if amount == 0 {
            return Err(SourceError::ZeroAmount);
        }
        let pool = asset.balance_of(reserve);
        let available = self.redeemable(owner, pool).min(exit_cap);
        if amount > available {
            return Err(SourceError::InsufficientLiquidity {
                requested: amount,
                available,
            });
        }
        let burned = self
            .shares_for_withdrawal(amount, pool)?
            .min(self.shares_of(owner));
        asset.transfer(reserve, recipient, amount)?;
        self.burn(owner, burned)?;
        Ok(burned)
    }
}
