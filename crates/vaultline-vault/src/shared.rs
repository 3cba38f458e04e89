//! Lock wrapper for multi-threaded callers.
//!
//! Every operation takes the lock for its whole duration, so operations on
//! the same vault are serialized and each one observes the state left by
//! the previous one.

use std::sync::{Arc, Mutex};

use vaultline_ledger::RefreshOutcome;
use vaultline_source::{BaseAsset, InMemoryAsset};
use vaultline_types::{Address, Amount, StrategyId};

use crate::vault::{DepositReceipt, RewardBalance, Vault, WithdrawReceipt};
use crate::{Result, VaultError};

/// A cloneable, thread-safe handle to a [`Vault`].
pub struct SharedVault<A: BaseAsset = InMemoryAsset> {
    inner: Arc<Mutex<Vault<A>>>,
}

impl<A: BaseAsset> Clone for SharedVault<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: BaseAsset> SharedVault<A> {
    /// Wrap `vault`.
    pub fn new(vault: Vault<A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vault)),
        }
    }

    /// Run `f` with exclusive access to the vault.
    ///
    /// # Errors
    ///
    /// - [`VaultError::LockPoisoned`] if another thread panicked while
    ///   holding the lock
    pub fn with<R>(&self, f: impl FnOnce(&mut Vault<A>) -> R) -> Result<R> {
        let mut guard = self.inner.lock().map_err(|_| {
            tracing::error!("vault lock poisoned");
            VaultError::LockPoisoned
        })?;
        Ok(f(&mut guard))
    }

    /// See [`Vault::deposit`].
    pub fn deposit(
        &self,
        user: &Address,
        strategy: StrategyId,
        amount: Amount,
    ) -> Result<DepositReceipt> {
        self.with(|vault| vault.deposit(user, strategy, amount))?
    }

    /// See [`Vault::withdraw`].
    pub fn withdraw(
        &self,
        user: &Address,
        strategy: StrategyId,
        amount: Amount,
    ) -> Result<WithdrawReceipt> {
        self.with(|vault| vault.withdraw(user, strategy, amount))?
    }

    /// See [`Vault::claim`].
    pub fn claim(&self, user: &Address, strategy: StrategyId) -> Result<Amount> {
        self.with(|vault| vault.claim(user, strategy))?
    }

    /// See [`Vault::refresh`].
    pub fn refresh(&self, strategy: StrategyId) -> Result<RefreshOutcome> {
        self.with(|vault| vault.refresh(strategy))?
    }

    /// See [`Vault::get_user_deposit_balance`].
    pub fn get_user_deposit_balance(&self, user: &Address, strategy: StrategyId) -> Result<Amount> {
        self.with(|vault| vault.get_user_deposit_balance(user, strategy))
    }

    /// See [`Vault::get_reward_balance`].
    pub fn get_reward_balance(&self, user: &Address) -> Result<RewardBalance> {
        self.with(|vault| vault.get_reward_balance(user))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VaultConfig;
    use vaultline_source::{AmmPoolSource, StakingSource};
    use vaultline_types::units::tokens;

    fn shared() -> SharedVault {
        let vault = Vault::new(
            Address::derive("vault"),
            InMemoryAsset::new(),
            Box::new(StakingSource::new(Address::derive("staking"))),
            Box::new(AmmPoolSource::new(Address::derive("amm"))),
            VaultConfig::default(),
        )
        .expect("create vault");
        SharedVault::new(vault)
    }

    #[test]
    fn test_concurrent_deposits_serialize() {
        let vault = shared();
        let users: Vec<Address> = (0..8)
            .map(|i| Address::derive(&format!("user-{i}")))
            .collect();
        vault
            .with(|v| {
                let spender = v.address();
                for user in &users {
                    v.asset_mut().mint(user, tokens(100)).expect("mint");
                    v.asset_mut().approve(user, &spender, Amount::MAX);
                }
            })
            .expect("fund");

        std::thread::scope(|scope| {
            for user in &users {
                let vault = vault.clone();
                scope.spawn(move || {
                    for _ in 0..10 {
                        vault
                            .deposit(user, StrategyId::Staking, tokens(5))
                            .expect("deposit");
                    }
                });
            }
        });

        let total = vault
            .with(|v| v.ledger(StrategyId::Staking).total_principal())
            .expect("read");
        assert_eq!(total, tokens(400));
        for user in &users {
            assert_eq!(
                vault
                    .get_user_deposit_balance(user, StrategyId::Staking)
                    .expect("balance"),
                tokens(50)
            );
        }
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_poisoned_lock_reports_error() {
        let vault = shared();
        let clone = vault.clone();
        let _ = std::thread::spawn(move || {
            let _ = clone.with(|_| panic!("boom"));
        })
        .join();

        assert_eq!(
            vault.refresh(StrategyId::Amm),
            Err(VaultError::LockPoisoned)
        );
    }
}
