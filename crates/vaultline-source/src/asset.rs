//! Base-asset transfer and approval semantics.
//!
//! [`InMemoryAsset`] models a rebasing liquid-staking token: balances,
//! allowances, and `mint`/`burn` hooks that harnesses use to credit rebase
//! rewards to a source or to impair it.

use std::collections::HashMap;

use vaultline_types::{Address, Amount};

use crate::{Result, SourceError};

/// Token operations the vault and its sources rely on.
pub trait BaseAsset: Send {
    /// Balance held by `account`.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Amount `spender` may still move out of `owner`'s balance.
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Set `spender`'s allowance over `owner`'s balance.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount);

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::TransferFailed`] if `from` lacks the balance
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()>;

    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    ///
    /// # Errors
    ///
    /// - [`SourceError::InsufficientApproval`] if the allowance is short
    /// - [`SourceError::TransferFailed`] if `from` lacks the balance
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()>;
}

/// In-memory rebasing base token.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAsset {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl InMemoryAsset {
    /// Create an empty token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `account`, growing total supply.
    ///
    /// Crediting a yield source's reserve account is how a rebase reward
    /// shows up in its redeemable balance.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Overflow`] if the supply would overflow
    pub fn mint(&mut self, account: &Address, amount: Amount) -> Result<()> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(SourceError::Overflow)?;
        let balance = self.balances.entry(*account).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(SourceError::Overflow)?;
        self.total_supply = supply;
        tracing::trace!(%account, amount, "asset: minted");
        Ok(())
    }

    /// Destroy `amount` of `account`'s balance.
    ///
    /// Burning from a source's reserve models slashing or pool impairment.
    ///
    /// # Errors
    ///
    /// - [`SourceError::TransferFailed`] if `account` holds less than `amount`
    pub fn burn(&mut self, account: &Address, amount: Amount) -> Result<()> {
        self.debit(account, amount)?;
        self.total_supply -= amount;
        tracing::trace!(%account, amount, "asset: burned");
        Ok(())
    }

    /// Total tokens in existence.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(SourceError::TransferFailed {
                needed: amount,
                available,
            });
        }
        self.balances.insert(*account, available - amount);
        Ok(())
    }
}

impl BaseAsset for InMemoryAsset {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances.insert((*owner, *spender), amount);
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<()> {
        if from == to {
            let available = self.balance_of(from);
            return if available < amount {
                Err(SourceError::TransferFailed {
                    needed: amount,
                    available,
                })
            } else {
                Ok(())
            };
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(SourceError::Overflow)?;
        self.debit(from, amount)?;
        self.balances.insert(*to, credited);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<()> {
        let allowance = self.allowance(from, spender);
        if allowance < amount {
            return Err(SourceError::InsufficientApproval {
                needed: amount,
                allowance,
            });
        }
        self.transfer(from, to, amount)?;
        self.allowances.insert((*from, *spender), allowance - amount);
        Ok(())
    }
}
