//! Event payloads emitted by the vault.
//!
//! A committed deposit, withdrawal or claim produces one event, preceded by
//! a refresh event when its refresh credited growth or observed a loss.
//! Events are serialized as tagged JSON.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, StrategyId};

/// A vault event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// Principal deposited into a strategy.
    Deposited {
        user: Address,
        strategy: StrategyId,
        amount: Amount,
        /// The user's principal in the strategy after the deposit.
        total_principal: Amount,
        shares_minted: Amount,
    },
    /// Principal withdrawn from a strategy.
    Withdrawn {
        user: Address,
        strategy: StrategyId,
        amount: Amount,
        total_principal: Amount,
        shares_burned: Amount,
    },
    /// Accrued rewards paid out.
    Claimed {
        user: Address,
        strategy: StrategyId,
        amount: Amount,
    },
    /// A refresh credited new growth to the accumulator.
    Refreshed {
        strategy: StrategyId,
        distributed: Amount,
        reward_acc_per_share: u128,
    },
    /// A refresh observed a redeemable balance below the high-water mark.
    LossObserved {
        strategy: StrategyId,
        unrecovered_loss: Amount,
    },
}

impl VaultEvent {
    /// Strategy the event belongs to.
    pub fn strategy(&self) -> StrategyId {
        match self {
            VaultEvent::Deposited { strategy, .. }
            | VaultEvent::Withdrawn { strategy, .. }
            | VaultEvent::Claimed { strategy, .. }
            | VaultEvent::Refreshed { strategy, .. }
            | VaultEvent::LossObserved { strategy, .. } => *strategy,
        }
    }

    /// User the event belongs to, if it is user-initiated.
    pub fn user(&self) -> Option<Address> {
        match self {
            VaultEvent::Deposited { user, .. }
            | VaultEvent::Withdrawn { user, .. }
            | VaultEvent::Claimed { user, .. } => Some(*user),
            VaultEvent::Refreshed { .. } | VaultEvent::LossObserved { .. } => None,
        }
    }
}
