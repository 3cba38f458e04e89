//! Scenario execution and reporting.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use vaultline_ledger::RefreshOutcome;
use vaultline_source::{accrual, AmmPoolSource, BaseAsset, InMemoryAsset, StakingSource};
use vaultline_types::units::parse_units;
use vaultline_types::{Address, Amount, StrategyId};
use vaultline_vault::events::Envelope;
use vaultline_vault::{
    DepositReceipt, RewardBalance, StrategySnapshot, Vault, VaultError, WithdrawReceipt,
};

use crate::scenario::{Scenario, Step};

/// What a successful step did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepDetail {
    Minted { account: Address, amount: Amount },
    Approved { owner: Address, amount: Amount },
    Deposited(DepositReceipt),
    Withdrawn(WithdrawReceipt),
    Claimed { strategy: StrategyId, amount: Amount },
    ClaimedAll(RewardBalance),
    Credited { strategy: StrategyId, amount: Amount },
    Impaired { strategy: StrategyId, amount: Amount },
    Advanced { seconds: u64, staking: Amount, amm: Amount },
    Refreshed(RefreshOutcome),
}

/// Outcome of one step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub action: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<StepDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// End state of one account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountReport {
    pub label: String,
    pub address: Address,
    pub wallet: Amount,
    pub deposits: BTreeMap<StrategyId, Amount>,
    pub claimed: BTreeMap<StrategyId, Amount>,
    pub pending_rewards: RewardBalance,
}

/// Full run report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub scenario: String,
    pub elapsed_secs: u64,
    pub steps: Vec<StepRecord>,
    pub strategies: Vec<StrategySnapshot>,
    pub accounts: Vec<AccountReport>,
    pub events: Vec<Envelope>,
}

/// Drives a vault through a scenario.
pub struct Runner {
    name: String,
    vault: Vault,
    staking_apr_bps: u32,
    amm_fee_apr_bps: u32,
    accounts: BTreeMap<String, Address>,
    events: broadcast::Receiver<Envelope>,
    log: Vec<Envelope>,
    elapsed_secs: u64,
}

impl Runner {
    /// Build a fresh vault for `scenario`.
    pub fn new(scenario: &Scenario) -> anyhow::Result<Self> {
        let staking = StakingSource::new(Address::derive("staking-source"));
        let amm = AmmPoolSource::with_exit_limit(
            Address::derive("amm-source"),
            scenario.sources.amm_max_exit_bps,
        );
        let vault = Vault::new(
            Address::derive("vault"),
            InMemoryAsset::new(),
            Box::new(staking),
            Box::new(amm),
            scenario.vault.clone(),
        )
        .context("create vault")?;
        let events = vault.subscribe();

        Ok(Self {
            name: scenario.name.clone(),
            vault,
            staking_apr_bps: scenario.sources.staking_apr_bps,
            amm_fee_apr_bps: scenario.sources.amm_fee_apr_bps,
            accounts: BTreeMap::new(),
            events,
            log: Vec::new(),
            elapsed_secs: 0,
        })
    }

    /// Run every step and report the end state.
    ///
    /// A failing step is recorded and the run continues.
    pub fn run(mut self, steps: &[Step]) -> anyhow::Result<Report> {
        let mut records = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            for label in step.accounts() {
                self.account(label);
            }
            let record = match self.apply(step) {
                Ok(detail) => StepRecord {
                    index,
                    action: step.action(),
                    ok: true,
                    detail: Some(detail),
                    error: None,
                },
                Err(err) => {
                    tracing::warn!(index, action = step.action(), error = %format!("{err:#}"), "sim: step failed");
                    StepRecord {
                        index,
                        action: step.action(),
                        ok: false,
                        detail: None,
                        error: Some(format!("{err:#}")),
                    }
                }
            };
            records.push(record);
            self.drain_events();
        }
        self.report(records)
    }

    fn account(&mut self, label: &str) -> Address {
        *self
            .accounts
            .entry(label.to_string())
            .or_insert_with(|| Address::derive(label))
    }

    fn apply(&mut self, step: &Step) -> anyhow::Result<StepDetail> {
        let detail = match step {
            Step::Mint { to, amount } => {
                let account = self.account(to);
                let amount = amount_of(amount)?;
                self.vault.asset_mut().mint(&account, amount)?;
                StepDetail::Minted { account, amount }
            }
            Step::Approve { owner, amount } => {
                let owner = self.account(owner);
                let amount = match amount {
                    Some(text) => amount_of(text)?,
                    None => Amount::MAX,
                };
                let spender = self.vault.address();
                self.vault.asset_mut().approve(&owner, &spender, amount);
                StepDetail::Approved { owner, amount }
            }
            Step::Deposit {
                user,
                strategy,
                amount,
            } => {
                let user = self.account(user);
                let receipt = self
                    .vault
                    .deposit(&user, strategy_of(*strategy)?, amount_of(amount)?)?;
                StepDetail::Deposited(receipt)
            }
            Step::Withdraw {
                user,
                strategy,
                amount,
            } => {
                let user = self.account(user);
                let receipt = self
                    .vault
                    .withdraw(&user, strategy_of(*strategy)?, amount_of(amount)?)?;
                StepDetail::Withdrawn(receipt)
            }
            Step::Claim { user, strategy } => {
                let user = self.account(user);
                match strategy {
                    Some(id) => {
                        let strategy = strategy_of(*id)?;
                        let amount = self.vault.claim(&user, strategy)?;
                        StepDetail::Claimed { strategy, amount }
                    }
                    None => StepDetail::ClaimedAll(self.vault.claim_all(&user)?),
                }
            }
            Step::Accrue { strategy, amount } => {
                let strategy = strategy_of(*strategy)?;
                let amount = amount_of(amount)?;
                let source = self.vault.source(strategy).address();
                self.vault.asset_mut().mint(&source, amount)?;
                StepDetail::Credited { strategy, amount }
            }
            Step::Impair { strategy, amount } => {
                let strategy = strategy_of(*strategy)?;
                let amount = amount_of(amount)?;
                let source = self.vault.source(strategy).address();
                self.vault.asset_mut().burn(&source, amount)?;
                StepDetail::Impaired { strategy, amount }
            }
            Step::Advance { seconds } => {
                let staking = self.vault.source(StrategyId::Staking).address();
                let staking_reward = accrual(
                    self.vault.asset().balance_of(&staking),
                    self.staking_apr_bps,
                    *seconds,
                );
                let amm = self.vault.source(StrategyId::Amm).address();
                let amm_fees = accrual(
                    self.vault.asset().balance_of(&amm),
                    self.amm_fee_apr_bps,
                    *seconds,
                );

                for (source, amount) in [(staking, staking_reward), (amm, amm_fees)] {
                    if amount > 0 {
                        self.vault.asset_mut().mint(&source, amount)?;
                    }
                }
                self.elapsed_secs = self.elapsed_secs.saturating_add(*seconds);
                StepDetail::Advanced {
                    seconds: *seconds,
                    staking: staking_reward,
                    amm: amm_fees,
                }
            }
            Step::Refresh { strategy } => {
                StepDetail::Refreshed(self.vault.refresh(strategy_of(*strategy)?)?)
            }
        };
        Ok(detail)
    }

    fn drain_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(envelope) => self.log.push(envelope),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "sim: event log lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn report(self, steps: Vec<StepRecord>) -> anyhow::Result<Report> {
        let mut accounts = Vec::with_capacity(self.accounts.len());
        for (label, address) in &self.accounts {
            let mut deposits = BTreeMap::new();
            let mut claimed = BTreeMap::new();
            for strategy in StrategyId::ALL {
                if let Some(position) = self.vault.position(address, strategy) {
                    deposits.insert(strategy, position.principal);
                    claimed.insert(strategy, position.claimed_rewards);
                }
            }
            accounts.push(AccountReport {
                label: label.clone(),
                address: *address,
                wallet: self.vault.asset().balance_of(address),
                deposits,
                claimed,
                pending_rewards: self.vault.get_reward_balance(address)?,
            });
        }

        Ok(Report {
            scenario: self.name,
            elapsed_secs: self.elapsed_secs,
            steps,
            strategies: StrategyId::ALL
                .iter()
                .map(|s| self.vault.strategy_snapshot(*s))
                .collect(),
            accounts,
            events: self.log,
        })
    }
}

fn strategy_of(id: u8) -> Result<StrategyId, VaultError> {
    StrategyId::try_from(id).map_err(VaultError::from)
}

fn amount_of(text: &str) -> anyhow::Result<Amount> {
    parse_units(text).with_context(|| format!("amount {text:?}"))
}
