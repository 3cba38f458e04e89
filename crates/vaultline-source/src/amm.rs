//! AMM liquidity yield source.
//!
//! Deposits become LP shares of a pooled reserve. Swap fees accrue into the
//! reserve; impairment shows up as the reserve shrinking. A single exit may
//! take at most `max_exit_bps` of the reserve, modelling a pool that cannot
//! unwind a large position at once.

use vaultline_types::{Address, Amount, BPS_DENOMINATOR};

use crate::asset::BaseAsset;
use crate::book::ShareBook;
use crate::{Result, SourceKind, YieldSource};

/// Default share of the reserve one exit may take (100%).
pub const DEFAULT_MAX_EXIT_BPS: u16 = 10_000;

/// Fee APR, in basis points, harnesses simulate by default (6%).
pub const DEFAULT_FEE_APR_BPS: u32 = 600;

/// An AMM liquidity pool.
#[derive(Clone, Debug)]
pub struct AmmPoolSource {
    address: Address,
    max_exit_bps: u16,
    book: ShareBook,
}

impl AmmPoolSource {
    /// Create a pool whose reserve lives at `address`.
    pub fn new(address: Address) -> Self {
        Self::with_exit_limit(address, DEFAULT_MAX_EXIT_BPS)
    }

    /// Create a pool whose single exits may take at most `max_exit_bps` of
    /// the reserve.
    ///
    /// `max_exit_bps` is clamped to 10,000.
    pub fn with_exit_limit(address: Address, max_exit_bps: u16) -> Self {
        Self {
            address,
            max_exit_bps: max_exit_bps.min(BPS_DENOMINATOR as u16),
            book: ShareBook::new(),
        }
    }

    /// Largest single exit the pool allows given its current reserve.
    pub fn exit_cap(&self, reserve: Amount) -> Amount {
        if self.max_exit_bps as u128 == BPS_DENOMINATOR {
            return reserve;
        }
        reserve / BPS_DENOMINATOR * self.max_exit_bps as u128
            + reserve % BPS_DENOMINATOR * self.max_exit_bps as u128 / BPS_DENOMINATOR
    }

    /// The pool's share book.
    pub fn book(&self) -> &ShareBook {
        &self.book
    }
}

impl YieldSource for AmmPoolSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Amm
    }

    fn address(&self) -> Address {
        self.address
    }

    fn deposit(&mut self, asset: &mut dyn BaseAsset, owner: &Address, amount: Amount) -> Result<()> {
        let minted = self.book.deposit_into(asset, &self.address, owner, amount)?;
        tracing::debug!(%owner, amount, lp_minted = minted, "amm: add liquidity");
        Ok(())
    }

    fn withdraw(
        &mut self,
        asset: &mut dyn BaseAsset,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()> {
        let cap = self.exit_cap(asset.balance_of(&self.address));
        let burned = self
            .book
            .withdraw_from(asset, &self.address, owner, recipient, amount, cap)?;
        tracing::debug!(%owner, %recipient, amount, lp_burned = burned, "amm: remove liquidity");
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

    fn funded_pool(max_exit_bps: u16) -> (InMemoryAsset, AmmPoolSource, Address) {
        let vault = Address::derive("vault");
        let mut asset = InMemoryAsset::new();
        asset.mint(&vault, 10_000).expect("mint");
        let mut pool = AmmPoolSource::with_exit_limit(Address::derive("curve"), max_exit_bps);
        pool.deposit(&mut asset, &vault, 10_000).expect("deposit");
        (asset, pool, vault)
    }

    #[test]
    fn test_exit_cap() {
        let pool = AmmPoolSource::with_exit_limit(Address::derive("curve"), 2_500);
        assert_eq!(pool.exit_cap(10_000), 2_500);
        assert_eq!(pool.exit_cap(3), 0);
        let open = AmmPoolSource::new(Address::derive("curve"));
        assert_eq!(open.exit_cap(12_345), 12_345);
    }

    #[test]
    fn test_exit_limited_by_cap() {
        let (mut asset, mut pool, vault) = funded_pool(2_500);
        let err = pool
            .withdraw(&mut asset, &vault, &vault, 3_000)
            .expect_err("illiquid");
        assert_eq!(
            err,
            SourceError::InsufficientLiquidity {
                requested: 3_000,
                available: 2_500
            }
        );
        pool.withdraw(&mut asset, &vault, &vault, 2_500)
            .expect("within cap");
        assert_eq!(pool.redeemable_balance(&asset, &vault), 7_500);
    }

    #[test]
    fn test_impairment_shrinks_redeemable() {
        let (mut asset, pool, vault) = funded_pool(10_000);
        let curve = pool.address();
        asset.burn(&curve, 1_000).expect("impair");
        assert_eq!(pool.redeemable_balance(&asset, &vault), 9_000);
    }

    #[test]
    fn test_fee_accrual_grows_redeemable() {
        let (mut asset, pool, vault) = funded_pool(10_000);
        asset.mint(&pool.address(), 250).expect("fees");
        assert_eq!(pool.redeemable_balance(&asset, &vault), 10_250);
    }
}
