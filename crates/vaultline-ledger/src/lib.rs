//! # vaultline-ledger
//!
//! Reward accounting for pooled yield strategies.
//!
//! Each strategy keeps a reward-per-share accumulator. Growth of the
//! strategy's redeemable balance is folded into the accumulator on refresh,
//! and each position claims `(acc_now - checkpoint) * shares` lazily the
//! next time it is touched. Claims are O(1) regardless of the number of
//! depositors.
//!
//! ## Modules
//!
//! - [`math`] — Fixed-point accumulator arithmetic
//! - [`strategy`] — Per-strategy ledger and balance diffing
//! - [`position`] — Per-(user, strategy) checkpointing and claims

pub mod math;
pub mod position;
pub mod strategy;

pub use position::UserPosition;
pub use strategy::{RefreshOutcome, StrategyLedger};

use vaultline_types::Amount;

/// Error types for ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Arithmetic overflow in accumulator calculation.
    #[error("arithmetic overflow")]
    Overflow,

    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// Withdrawal exceeds the position's principal.
    #[error("insufficient principal: requested {requested}, available {available}")]
    InsufficientPrincipal {
        /// Amount requested.
        requested: Amount,
        /// Principal the position holds.
        available: Amount,
    },

    /// Withdrawal exceeds the strategy's aggregate principal or shares.
    #[error("insufficient strategy balance: requested {requested}, available {available}")]
    InsufficientStrategyBalance {
        /// Amount requested.
        requested: Amount,
        /// Amount the strategy tracks.
        available: Amount,
    },

    /// No rewards available to claim.
    #[error("no rewards available")]
    NothingToClaim,
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
