//! # vaultline-vault
//!
//! The multi-strategy yield vault.
//!
//! Users deposit the base asset into a strategy; the vault forwards the
//! principal to the strategy's yield source and accounts each user's
//! principal and share of strategy rewards. Every state-changing entry point
//! refreshes the strategy's accumulator before applying its own mutation,
//! and commits all of it or none of it.
//!
//! ## Modules
//!
//! - [`vault`] — Deposit / withdraw / claim orchestration and views
//! - [`config`] — TOML configuration
//! - [`events`] — Event bus and subscription filters
//! - [`shared`] — Lock wrapper for multi-threaded callers

pub mod config;
pub mod events;
pub mod shared;
pub mod vault;

pub use config::VaultConfig;
pub use events::{EventBus, EventFilter};
pub use shared::SharedVault;
pub use vault::{DepositReceipt, RewardBalance, StrategySnapshot, Vault, WithdrawReceipt};

use vaultline_ledger::LedgerError;
use vaultline_source::SourceError;
use vaultline_types::{Amount, TypesError};

/// Error types for vault operations.
///
/// Every failure leaves the vault's state exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    /// Amount is zero or below the configured minimum.
    #[error("invalid amount: {0}")]
    InvalidAmount(Amount),

    /// Unknown strategy id.
    #[error("invalid strategy id {0}")]
    InvalidStrategy(u8),

    /// The user has not approved the vault for the amount.
    #[error("insufficient approval: needed {needed}, allowance {allowance}")]
    InsufficientApproval {
        /// Amount the deposit required.
        needed: Amount,
        /// Allowance granted to the vault.
        allowance: Amount,
    },

    /// A base-asset transfer failed for lack of balance.
    #[error("transfer failed: needed {needed}, available {available}")]
    TransferFailed {
        /// Amount the transfer required.
        needed: Amount,
        /// Balance available.
        available: Amount,
    },

    /// Withdrawal exceeds the user's principal.
    #[error("insufficient principal: requested {requested}, available {available}")]
    InsufficientPrincipal {
        /// Amount requested.
        requested: Amount,
        /// The user's principal in the strategy.
        available: Amount,
    },

    /// Withdrawal exceeds what the strategy's ledger tracks.
    #[error("insufficient strategy balance: requested {requested}, available {available}")]
    InsufficientStrategyBalance {
        /// Amount requested.
        requested: Amount,
        /// Amount the strategy tracks.
        available: Amount,
    },

    /// The yield source cannot return the requested amount.
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        /// Amount requested.
        requested: Amount,
        /// Amount the source could return.
        available: Amount,
    },

    /// No rewards available to claim.
    #[error("nothing to claim")]
    NothingToClaim,

    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// The shared vault's lock was poisoned by a panicking holder.
    #[error("vault lock poisoned")]
    LockPoisoned,

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

impl From<SourceError> for VaultError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::TransferFailed { needed, available } => {
                VaultError::TransferFailed { needed, available }
            }
            SourceError::InsufficientApproval { needed, allowance } => {
                VaultError::InsufficientApproval { needed, allowance }
            }
            SourceError::InsufficientLiquidity {
                requested,
                available,
            } => VaultError::InsufficientLiquidity {
                requested,
                available,
            },
            SourceError::ZeroAmount => VaultError::InvalidAmount(0),
            SourceError::Overflow => VaultError::Overflow,
        }
    }
}

impl From<LedgerError> for VaultError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Overflow => VaultError::Overflow,
            LedgerError::ZeroAmount => VaultError::InvalidAmount(0),
            LedgerError::InsufficientPrincipal {
                requested,
                available,
            } => VaultError::InsufficientPrincipal {
                requested,
                available,
            },
            LedgerError::InsufficientStrategyBalance {
                requested,
                available,
            } => VaultError::InsufficientStrategyBalance {
                requested,
                available,
            },
            LedgerError::NothingToClaim => VaultError::NothingToClaim,
        }
    }
}

impl From<TypesError> for VaultError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::UnknownStrategy(id) => VaultError::InvalidStrategy(id),
            other => VaultError::Config(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultline_types::StrategyId;

    #[test]
    fn test_unknown_strategy_maps_to_invalid_strategy() {
        let err: VaultError = StrategyId::try_from(7)
            .map_err(VaultError::from)
            .expect_err("unknown id");
        assert_eq!(err, VaultError::InvalidStrategy(7));
    }

    #[test]
    fn test_source_errors_map_to_vault_kinds() {
        let err: VaultError = SourceError::InsufficientLiquidity {
            requested: 5,
            available: 2,
        }
        .into();
        assert_eq!(
            err,
            VaultError::InsufficientLiquidity {
                requested: 5,
                available: 2
            }
        );
        assert_eq!(
            VaultError::from(SourceError::ZeroAmount),
            VaultError::InvalidAmount(0)
        );
    }

    #[test]
    fn test_ledger_errors_map_to_vault_kinds() {
        assert_eq!(
            VaultError::from(LedgerError::NothingToClaim),
            VaultError::NothingToClaim
        );
        assert_eq!(
            VaultError::from(LedgerError::InsufficientPrincipal {
                requested: 3,
                available: 1
            }),
            VaultError::InsufficientPrincipal {
                requested: 3,
                available: 1
            }
        );
    }
}
