//! Deposit, withdrawal and claim orchestration.
//!
//! Every mutating entry point follows the same shape:
//!
//! 1. Read the strategy's redeemable balance from its yield source.
//! 2. Refresh a staged copy of the strategy ledger against it.
//! 3. Settle a staged copy of the caller's position at the new accumulator.
//! 4. Apply the caller's mutation to the staged copies.
//! 5. Perform the single external base-asset movement.
//! 6. Commit the staged copies and emit events.
//!
//! A failure in any step returns before step 6, so nothing is retained.

use std::collections::BTreeMap;

use serde::Serialize;
use vaultline_ledger::{RefreshOutcome, StrategyLedger, UserPosition};
use vaultline_source::{BaseAsset, InMemoryAsset, SourceKind, YieldSource};
use vaultline_types::events::VaultEvent;
use vaultline_types::{Address, Amount, StrategyId};

use crate::config::VaultConfig;
use crate::events::{Envelope, EventBus};
use crate::{Result, VaultError};

/// Rewards per strategy for one user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RewardBalance {
    /// Staking strategy rewards.
    pub staking: Amount,
    /// AMM strategy rewards.
    pub amm: Amount,
}

impl RewardBalance {
    /// Reward for `strategy`.
    pub fn get(&self, strategy: StrategyId) -> Amount {
        match strategy {
            StrategyId::Staking => self.staking,
            StrategyId::Amm => self.amm,
        }
    }

    fn set(&mut self, strategy: StrategyId, amount: Amount) {
        match strategy {
            StrategyId::Staking => self.staking = amount,
            StrategyId::Amm => self.amm = amount,
        }
    }

    /// Sum across strategies.
    pub fn total(&self) -> Amount {
        self.staking.saturating_add(self.amm)
    }
}

/// Result of a committed deposit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DepositReceipt {
    /// Shares minted for the deposit.
    pub shares_minted: u128,
    /// The user's principal in the strategy afterwards.
    pub total_principal: Amount,
}

/// Result of a committed withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct WithdrawReceipt {
    /// Shares burned for the withdrawal.
    pub shares_burned: u128,
    /// The user's principal in the strategy afterwards.
    pub total_principal: Amount,
}

/// Point-in-time view of one strategy's aggregates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StrategySnapshot {
    pub strategy: StrategyId,
    pub source: Address,
    pub total_principal: Amount,
    pub total_shares: u128,
    pub reward_acc_per_share: u128,
    pub last_known_balance: Amount,
    pub redeemable_balance: Amount,
    pub unrecovered_loss: Amount,
    pub total_distributed: Amount,
    pub total_claimed: Amount,
    pub unallocated: Amount,
    pub positions: usize,
}

struct StrategySlot {
    ledger: StrategyLedger,
    source: Box<dyn YieldSource>,
}

/// The multi-strategy vault.
pub struct Vault<A: BaseAsset = InMemoryAsset> {
    address: Address,
    config: VaultConfig,
    asset: A,
    strategies: Vec<StrategySlot>,
    positions: BTreeMap<(StrategyId, Address), UserPosition>,
    events: EventBus,
}

impl<A: BaseAsset> Vault<A> {
    /// Create a vault at `address` over `asset`, routing strategy 0 to
    /// `staking` and strategy 1 to `amm`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Config`] if the configuration is invalid or a source
    ///   is wired to the wrong strategy
    pub fn new(
        address: Address,
        asset: A,
        staking: Box<dyn YieldSource>,
        amm: Box<dyn YieldSource>,
        config: VaultConfig,
    ) -> Result<Self> {
        config.validate()?;
        if staking.kind() != SourceKind::Staking {
            return Err(VaultError::Config(
                "strategy 0 requires a staking source".to_string(),
            ));
        }
        if amm.kind() != SourceKind::Amm {
            return Err(VaultError::Config(
                "strategy 1 requires an AMM source".to_string(),
            ));
        }

        let events = EventBus::new(config.events.capacity);
        let strategies = vec![
            StrategySlot {
                ledger: StrategyLedger::new(StrategyId::Staking),
                source: staking,
            },
            StrategySlot {
                ledger: StrategyLedger::new(StrategyId::Amm),
                source: amm,
            },
        ];

        tracing::info!(vault = %address, "vault created");

        Ok(Self {
            address,
            config,
            asset,
            strategies,
            positions: BTreeMap::new(),
            events,
        })
    }

    /// The vault's own account address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Active configuration.
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// The base asset.
    pub fn asset(&self) -> &A {
        &self.asset
    }

    /// Mutable access to the base asset, for funding accounts and
    /// simulating rebases in harnesses.
    pub fn asset_mut(&mut self) -> &mut A {
        &mut self.asset
    }

    /// The yield source behind `strategy`.
    pub fn source(&self, strategy: StrategyId) -> &dyn YieldSource {
        self.strategies[strategy.index()].source.as_ref()
    }

    /// The event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to committed vault events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Envelope> {
        self.events.subscribe()
    }

    /// Bring `strategy`'s accumulator up to date with its yield source.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn refresh(&mut self, strategy: StrategyId) -> Result<RefreshOutcome> {
        let (ledger, outcome) = self.staged_ledger(strategy)?;
        self.strategies[strategy.index()].ledger = ledger;
        self.emit_refresh(strategy, outcome);
        Ok(outcome)
    }

    /// Deposit `amount` of `user`'s base asset into `strategy`.
    ///
    /// `user` must have approved the vault for at least `amount`.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidAmount`] if `amount` is zero or below the minimum
    /// - [`VaultError::InsufficientApproval`] if the vault's allowance is short
    /// - [`VaultError::TransferFailed`] if `user` lacks the balance
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn deposit(
        &mut self,
        user: &Address,
        strategy: StrategyId,
        amount: Amount,
    ) -> Result<DepositReceipt> {
        if amount == 0 || amount < self.config.limits.min_deposit as u128 {
            return Err(VaultError::InvalidAmount(amount));
        }

        let (mut ledger, outcome) = self.staged_ledger(strategy)?;
        let mut position = self.staged_position(user, strategy);
        position.settle(ledger.reward_acc_per_share())?;

        let shares = ledger.shares_for(amount)?;
        position.add_principal(amount, shares)?;
        ledger.deposit_principal(amount, shares)?;

        self.pull_into_source(user, strategy, amount)?;

        let total_principal = position.principal;
        self.commit(user, strategy, ledger, position, outcome);
        self.events.emit(VaultEvent::Deposited {
            user: *user,
            strategy,
            amount,
            total_principal,
            shares_minted: shares,
        });
        tracing::info!(%user, %strategy, amount, shares, total_principal, "vault: deposit");

        Ok(DepositReceipt {
            shares_minted: shares,
            total_principal,
        })
    }

    /// Withdraw `amount` of `user`'s principal from `strategy`.
    ///
    /// Accrued rewards stay in the position until claimed.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidAmount`] if `amount` is zero
    /// - [`VaultError::InsufficientPrincipal`] if `amount` exceeds the principal
    /// - [`VaultError::InsufficientLiquidity`] if the source cannot pay
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn withdraw(
        &mut self,
        user: &Address,
        strategy: StrategyId,
        amount: Amount,
    ) -> Result<WithdrawReceipt> {
        if amount == 0 {
            return Err(VaultError::InvalidAmount(amount));
        }
        let available = self.get_user_deposit_balance(user, strategy);
        if amount > available {
            return Err(VaultError::InsufficientPrincipal {
                requested: amount,
                available,
            });
        }

        let (mut ledger, outcome) = self.staged_ledger(strategy)?;
        let mut position = self.staged_position(user, strategy);
        position.settle(ledger.reward_acc_per_share())?;

        let burned = position.remove_principal(amount)?;
        ledger.withdraw_principal(amount, burned)?;

        let slot = &mut self.strategies[strategy.index()];
        slot.source
            .withdraw(&mut self.asset, &self.address, user, amount)?;

        let total_principal = position.principal;
        self.commit(user, strategy, ledger, position, outcome);
        self.events.emit(VaultEvent::Withdrawn {
            user: *user,
            strategy,
            amount,
            total_principal,
            shares_burned: burned,
        });
        tracing::info!(%user, %strategy, amount, burned, total_principal, "vault: withdraw");

        Ok(WithdrawReceipt {
            shares_burned: burned,
            total_principal,
        })
    }

    /// Pay out every reward `user` has accrued in `strategy`.
    ///
    /// Returns the amount paid.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NothingToClaim`] if nothing has accrued
    /// - [`VaultError::InsufficientLiquidity`] if the source cannot pay
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn claim(&mut self, user: &Address, strategy: StrategyId) -> Result<Amount> {
        if !self.positions.contains_key(&(strategy, *user)) {
            return Err(VaultError::NothingToClaim);
        }

        let (mut ledger, outcome) = self.staged_ledger(strategy)?;
        let mut position = self.staged_position(user, strategy);
        position.settle(ledger.reward_acc_per_share())?;

        let amount = position.take_rewards()?;
        ledger.record_payout(amount)?;

        let slot = &mut self.strategies[strategy.index()];
        slot.source
            .withdraw(&mut self.asset, &self.address, user, amount)?;

        self.commit(user, strategy, ledger, position, outcome);
        self.events.emit(VaultEvent::Claimed {
            user: *user,
            strategy,
            amount,
        });
        tracing::info!(%user, %strategy, amount, "vault: claim");

        Ok(amount)
    }

    /// Claim in every strategy where `user` has rewards.
    ///
    /// Each strategy's claim commits on its own; strategies with nothing
    /// to claim are skipped.
    ///
    /// # Errors
    ///
    /// - [`VaultError::NothingToClaim`] if no strategy had rewards
    /// - Any other error from [`Vault::claim`], after earlier strategies
    ///   have been paid
    pub fn claim_all(&mut self, user: &Address) -> Result<RewardBalance> {
        let mut paid = RewardBalance::default();
        for strategy in StrategyId::ALL {
            match self.claim(user, strategy) {
                Ok(amount) => paid.set(strategy, amount),
                Err(VaultError::NothingToClaim) => {}
                Err(err) => return Err(err),
            }
        }
        if paid.total() == 0 {
            return Err(VaultError::NothingToClaim);
        }
        Ok(paid)
    }

    /// Principal `user` has deposited in `strategy`.
    pub fn get_user_deposit_balance(&self, user: &Address, strategy: StrategyId) -> Amount {
        self.positions
            .get(&(strategy, *user))
            .map(|p| p.principal)
            .unwrap_or(0)
    }

    /// Rewards `user` could claim in each strategy if every strategy were
    /// refreshed now. Does not mutate any state.
    ///
    /// # Errors
    ///
    /// - [`VaultError::Overflow`] on arithmetic overflow
    pub fn get_reward_balance(&self, user: &Address) -> Result<RewardBalance> {
        let mut balance = RewardBalance::default();
        for strategy in StrategyId::ALL {
            let Some(position) = self.positions.get(&(strategy, *user)) else {
                continue;
            };
            let slot = &self.strategies[strategy.index()];
            let observed = slot.source.redeemable_balance(&self.asset, &self.address);
            let acc = slot.ledger.preview_acc(observed)?;
            balance.set(strategy, position.reward_balance(acc)?);
        }
        Ok(balance)
    }

    /// Total reward ever credited by `strategy`.
    pub fn reward_count(&self, strategy: StrategyId) -> Amount {
        self.strategies[strategy.index()].ledger.total_distributed()
    }

    /// Total reward ever credited by the staking strategy.
    pub fn staking_reward_count(&self) -> Amount {
        self.reward_count(StrategyId::Staking)
    }

    /// Total reward ever credited by the AMM strategy.
    pub fn amm_reward_count(&self) -> Amount {
        self.reward_count(StrategyId::Amm)
    }

    /// `user`'s position in `strategy`, if one was ever opened.
    pub fn position(&self, user: &Address, strategy: StrategyId) -> Option<&UserPosition> {
        self.positions.get(&(strategy, *user))
    }

    /// Every position ever opened in `strategy`.
    pub fn positions(
        &self,
        strategy: StrategyId,
    ) -> impl Iterator<Item = (&Address, &UserPosition)> + '_ {
        self.positions
            .range((strategy, Address::ZERO)..)
            .take_while(move |((s, _), _)| *s == strategy)
            .map(|((_, user), position)| (user, position))
    }

    /// The ledger of `strategy`.
    pub fn ledger(&self, strategy: StrategyId) -> &StrategyLedger {
        &self.strategies[strategy.index()].ledger
    }

    /// Aggregates of `strategy` as of its last refresh, plus the source's
    /// current redeemable balance.
    pub fn strategy_snapshot(&self, strategy: StrategyId) -> StrategySnapshot {
        let slot = &self.strategies[strategy.index()];
        let ledger = &slot.ledger;
        StrategySnapshot {
            strategy,
            source: slot.source.address(),
            total_principal: ledger.total_principal(),
            total_shares: ledger.total_shares(),
            reward_acc_per_share: ledger.reward_acc_per_share(),
            last_known_balance: ledger.last_known_balance(),
            redeemable_balance: slot.source.redeemable_balance(&self.asset, &self.address),
            unrecovered_loss: ledger.unrecovered_loss(),
            total_distributed: ledger.total_distributed(),
            total_claimed: ledger.total_claimed(),
            unallocated: ledger.unallocated(),
            positions: self.positions(strategy).count(),
        }
    }

    fn staged_ledger(&self, strategy: StrategyId) -> Result<(StrategyLedger, RefreshOutcome)> {
        let slot = &self.strategies[strategy.index()];
        let observed = slot.source.redeemable_balance(&self.asset, &self.address);
        let mut ledger = slot.ledger.clone();
        let outcome = ledger.refresh(observed)?;
        Ok((ledger, outcome))
    }

    fn staged_position(&self, user: &Address, strategy: StrategyId) -> UserPosition {
        self.positions
            .get(&(strategy, *user))
            .cloned()
            .unwrap_or_default()
    }

    /// Move `amount` from `user` through the vault into `strategy`'s source.
    fn pull_into_source(&mut self, user: &Address, strategy: StrategyId, amount: Amount) -> Result<()> {
        let allowance = self.asset.allowance(user, &self.address);
        self.asset
            .transfer_from(&self.address, user, &self.address, amount)?;

        let slot = &mut self.strategies[strategy.index()];
        if let Err(err) = slot.source.deposit(&mut self.asset, &self.address, amount) {
            // Hand the pulled funds and the allowance back.
            if let Err(refund) = self.asset.transfer(&self.address, user, amount) {
                tracing::error!(%user, amount, %refund, "vault: refund after source rejection failed");
            }
            self.asset.approve(user, &self.address, allowance);
            return Err(err.into());
        }
        Ok(())
    }

    fn commit(
        &mut self,
        user: &Address,
        strategy: StrategyId,
        ledger: StrategyLedger,
        position: UserPosition,
        outcome: RefreshOutcome,
    ) {
        self.strategies[strategy.index()].ledger = ledger;
        self.positions.insert((strategy, *user), position);
        self.emit_refresh(strategy, outcome);
    }

    fn emit_refresh(&self, strategy: StrategyId, outcome: RefreshOutcome) {
        match outcome {
            RefreshOutcome::Distributed { amount, .. } => {
                self.events.emit(VaultEvent::Refreshed {
                    strategy,
                    distributed: amount,
                    reward_acc_per_share: self.ledger(strategy).reward_acc_per_share(),
                });
            }
            RefreshOutcome::Loss { unrecovered_loss } => {
                self.events.emit(VaultEvent::LossObserved {
                    strategy,
                    unrecovered_loss,
                });
            }
            RefreshOutcome::Unchanged | RefreshOutcome::NoShares { .. } => {}
        }
    }
}

impl<A: BaseAsset> std::fmt::Debug for Vault<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("address", &self.address)
            .field("positions", &self.positions.len())
            .field("events", &self.events)
            .finish()
    }
}
