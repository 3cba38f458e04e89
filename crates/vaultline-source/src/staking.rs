//! Liquid-staking yield source.
//!
//! Holds deposited base asset in a pooled reserve. Staking rewards arrive
//! as rebase credit on the reserve account, so every depositor's
//! redeemable balance grows pro rata with no per-owner bookkeeping.

use vaultline_types::{Address, Amount};

use crate::asset::BaseAsset;
use crate::book::ShareBook;
use crate::{Result, SourceKind, YieldSource};

/// Staking APR, in basis points, harnesses simulate by default (4%).
pub const DEFAULT_STAKING_APR_BPS: u32 = 400;

/// A liquid-staking pool.
#[derive(Clone, Debug)]
pub struct StakingSource {
    address: Address,
    book: ShareBook,
}

impl StakingSource {
    /// Create a staking pool whose reserve lives at `address`.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            book: ShareBook::new(),
        }
    }

    /// The pool's share book.
    pub fn book(&self) -> &ShareBook {
        &self.book
    }
}

impl YieldSource for StakingSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Staking
    }

    fn address(&self) -> Address {
        self.address
    }

    fn deposit(&mut self, asset: &mut dyn BaseAsset, owner: &Address, amount: Amount) -> Result<()> {
        let minted = self.book.deposit_into(asset, &self.address, owner, amount)?;
        tracing::debug!(%owner, amount, minted, "staking: deposit");
        Ok(())
    }

    fn withdraw(
        &mut self,
        asset: &mut dyn BaseAsset,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()> {
        let burned =
            self.book
                .withdraw_from(asset, &self.address, owner, recipient, amount, Amount::MAX)?;
        tracing::debug!(%owner, %recipient, amount, burned, "staking: withdraw");
        Ok(())
    }

    fn redeemable_balance(&self, asset: &dyn BaseAsset, owner: &Address) -> Amount {
        self.book.redeemable(owner, asset.balance_of(&self.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::InMemoryAsset;
    use crate::SourceError;
    use vaultline_types::units::tokens;

    #[test]
    fn test_deposit_lands_in_reserve() {
        let pool_addr = Address::derive("lido");
        let vault = Address::derive("vault");
        let mut asset = InMemoryAsset::new();
        asset.mint(&vault, tokens(1000)).expect("mint");

        let mut pool = StakingSource::new(pool_addr);
        pool.deposit(&mut asset, &vault, tokens(1000))
            .expect("deposit");

        assert_eq!(asset.balance_of(&pool_addr), tokens(1000));
        assert_eq!(pool.redeemable_balance(&asset, &vault), tokens(1000));
    }

    #[test]
    fn test_rebase_grows_redeemable() {
        let pool_addr = Address::derive("lido");
        let vault = Address::derive("vault");
        let mut asset = InMemoryAsset::new();
        asset.mint(&vault, tokens(1000)).expect("mint");
        let mut pool = StakingSource::new(pool_addr);
        pool.deposit(&mut asset, &vault, tokens(1000))
            .expect("deposit");

        let reward = crate::accrual(tokens(1000), DEFAULT_STAKING_APR_BPS, 5 * 3600);
        asset.mint(&pool_addr, reward).expect("rebase");
        assert_eq!(
            pool.redeemable_balance(&asset, &vault),
            tokens(1000) + reward
        );
    }

    #[test]
    fn test_withdraw_more_than_held() {
        let pool_addr = Address::derive("lido");
        let vault = Address::derive("vault");
        let mut asset = InMemoryAsset::new();
        asset.mint(&vault, 100).expect("mint");
        let mut pool = StakingSource::new(pool_addr);
        pool.deposit(&mut asset, &vault, 100).expect("deposit");

        let err = pool
            .withdraw(&mut asset, &vault, &vault, 101)
            .expect_err("too much");
        assert!(matches!(err, SourceError::InsufficientLiquidity { .. }));
    }

    #[test]
    fn test_deposit_without_funds() {
        let vault = Address::derive("vault");
        let mut asset = InMemoryAsset::new();
        let mut pool = StakingSource::new(Address::derive("lido"));
        let err = pool
            .deposit(&mut asset, &vault, 1)
            .expect_err("no funds");
        assert!(matches!(err, SourceError::TransferFailed { .. }));
        assert_eq!(pool.book().total_shares(), 0);
    }
}
