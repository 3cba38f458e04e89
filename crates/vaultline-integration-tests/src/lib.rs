//! Integration test crate for the Vaultline vault.
//!
//! The tests under `tests/` drive a full vault over the in-memory asset and
//! sources. [`Harness`] wires one up and simulates the outside world:
//! funding wallets, rebase credit, impairment and the passage of time.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p vaultline-integration-tests
//! ```

use vaultline_source::amm::DEFAULT_FEE_APR_BPS;
use vaultline_source::staking::DEFAULT_STAKING_APR_BPS;
use vaultline_source::{
    accrual, AmmPoolSource, BaseAsset, InMemoryAsset, SourceError, StakingSource, YieldSource,
};
use vaultline_types::{Address, Amount, StrategyId};
use vaultline_vault::{Vault, VaultConfig, VaultError};

/// Staking APR used by [`Harness::advance`].
pub const STAKING_APR_BPS: u32 = DEFAULT_STAKING_APR_BPS;
/// AMM fee APR used by [`Harness::advance`].
pub const AMM_FEE_APR_BPS: u32 = DEFAULT_FEE_APR_BPS;

/// A vault plus handles on the world around it.
pub struct Harness {
    pub vault: Vault,
    pub staking: Address,
    pub amm: Address,
}

impl Harness {
    /// Default configuration, no AMM exit limit.
    pub fn new() -> Result<Self, VaultError> {
        Self::build(VaultConfig::default(), 10_000)
    }

    /// Default configuration with the AMM capped at `max_exit_bps` per exit.
    pub fn with_exit_limit(max_exit_bps: u16) -> Result<Self, VaultError> {
        Self::build(VaultConfig::default(), max_exit_bps)
    }

    /// Custom configuration, no AMM exit limit.
    pub fn with_config(config: VaultConfig) -> Result<Self, VaultError> {
        Self::build(config, 10_000)
    }

    fn build(config: VaultConfig, max_exit_bps: u16) -> Result<Self, VaultError> {
        let staking = StakingSource::new(Address::derive("staking-source"));
        let amm = AmmPoolSource::with_exit_limit(Address::derive("amm-source"), max_exit_bps);
        let (staking_address, amm_address) = (staking.address(), amm.address());
        let vault = Vault::new(
            Address::derive("vault"),
            InMemoryAsset::new(),
            Box::new(staking),
            Box::new(amm),
            config,
        )?;
        Ok(Self {
            vault,
            staking: staking_address,
            amm: amm_address,
        })
    }

    /// Address for a named test account.
    pub fn user(label: &str) -> Address {
        Address::derive(label)
    }

    /// Source address behind `strategy`.
    pub fn source(&self, strategy: StrategyId) -> Address {
        match strategy {
            StrategyId::Staking => self.staking,
            StrategyId::Amm => self.amm,
        }
    }

    /// Mint `amount` to `user` and approve the vault without limit.
    pub fn fund(&mut self, user: &Address, amount: Amount) -> Result<(), SourceError> {
        let spender = self.vault.address();
        self.vault.asset_mut().mint(user, amount)?;
        self.vault.asset_mut().approve(user, &spender, Amount::MAX);
        Ok(())
    }

    /// Rebase credit of `amount` to `strategy`'s source.
    pub fn accrue(&mut self, strategy: StrategyId, amount: Amount) -> Result<(), SourceError> {
        let source = self.source(strategy);
        self.vault.asset_mut().mint(&source, amount)
    }

    /// Burn `amount` from `strategy`'s source.
    pub fn impair(&mut self, strategy: StrategyId, amount: Amount) -> Result<(), SourceError> {
        let source = self.source(strategy);
        self.vault.asset_mut().burn(&source, amount)
    }

    /// Let `seconds` pass: each source earns its APR on its current reserve.
    ///
    /// Returns the amounts credited, staking first.
    pub fn advance(&mut self, seconds: u64) -> Result<(Amount, Amount), SourceError> {
        let staking = accrual(self.balance(&self.staking), STAKING_APR_BPS, seconds);
        let amm = accrual(self.balance(&self.amm), AMM_FEE_APR_BPS, seconds);
        self.accrue(StrategyId::Staking, staking)?;
        self.accrue(StrategyId::Amm, amm)?;
        Ok((staking, amm))
    }

    /// Base-asset balance of `account`.
    pub fn balance(&self, account: &Address) -> Amount {
        self.vault.asset().balance_of(account)
    }
}
