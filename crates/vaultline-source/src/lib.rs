//! # vaultline-source
//!
//! External collaborators of the vault: the base asset and the yield
//! sources the vault routes principal into.
//!
//! The vault only ever sees these through the [`BaseAsset`] and
//! [`YieldSource`] traits. Protocol-specific behaviour (staking rebases,
//! AMM exit limits) stays behind them.
//!
//! ## Modules
//!
//! - [`asset`] — Base-asset trait and the in-memory rebasing token
//! - [`book`] — Pooled share book shared by the in-memory sources
//! - [`staking`] — Liquid-staking yield source
//! - [`amm`] — AMM liquidity yield source

pub mod amm;
pub mod asset;
pub mod book;
pub mod staking;

use vaultline_types::{wide, Address, Amount, BPS_DENOMINATOR, SECONDS_PER_YEAR};

pub use amm::AmmPoolSource;
pub use asset::{BaseAsset, InMemoryAsset};
pub use staking::StakingSource;

/// Error types for asset and yield-source operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The sender does not hold enough of the base asset.
    #[error("transfer failed: needed {needed}, available {available}")]
    TransferFailed {
        /// Amount the transfer required.
        needed: Amount,
        /// Balance the sender holds.
        available: Amount,
    },

    /// The spender's allowance does not cover the transfer.
    #[error("insufficient approval: needed {needed}, allowance {allowance}")]
    InsufficientApproval {
        /// Amount the transfer required.
        needed: Amount,
        /// Allowance granted to the spender.
        allowance: Amount,
    },

    /// The source cannot return the requested amount right now.
    #[error("insufficient liquidity: requested {requested}, available {available}")]
    InsufficientLiquidity {
        /// Amount requested.
        requested: Amount,
        /// Amount the source could return.
        available: Amount,
    },

    /// Amount is zero.
    #[error("amount is zero")]
    ZeroAmount,

    /// Arithmetic overflow.
    #[error("arithmetic overflow in source accounting")]
    Overflow,
}

/// Convenience result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Which kind of protocol a yield source fronts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Liquid staking.
    Staking,
    /// AMM liquidity provision.
    Amm,
}

/// A yield-bearing destination for the vault's principal.
///
/// The source's redeemable balance grows through reward issuance the
/// vault cannot observe per user; the vault diffs it against its own
/// snapshot to infer rewards.
pub trait YieldSource: Send {
    /// Protocol kind of this source.
    fn kind(&self) -> SourceKind;

    /// Account holding the source's base-asset reserves.
    fn address(&self) -> Address;

    /// Move `amount` of base asset from `owner` into the source on its behalf.
    ///
    /// # Errors
    ///
    /// - [`SourceError::ZeroAmount`] if `amount` is zero
    /// - [`SourceError::TransferFailed`] if `owner` lacks the balance
    fn deposit(&mut self, asset: &mut dyn BaseAsset, owner: &Address, amount: Amount) -> Result<()>;

    /// Redeem `amount` of `owner`'s holdings and send it to `recipient`.
    ///
    /// # Errors
    ///
    /// - [`SourceError::ZeroAmount`] if `amount` is zero
    /// - [`SourceError::InsufficientLiquidity`] if the source cannot pay
    fn withdraw(
        &mut self,
        asset: &mut dyn BaseAsset,
        owner: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<()>;

    /// Current value (principal plus accrued yield) held for `owner`.
    fn redeemable_balance(&self, asset: &dyn BaseAsset, owner: &Address) -> Amount;
}

/// Yield accrued on `balance` at `apr_bps` over `elapsed_secs`.
///
/// Simple interest, floored. Used by harnesses to simulate the passage of
/// time against an in-memory source.
pub fn accrual(balance: Amount, apr_bps: u32, elapsed_secs: u64) -> Amount {
    let rate = apr_bps as u128 * elapsed_secs as u128;
    wide::mul_div(balance, rate, BPS_DENOMINATOR * SECONDS_PER_YEAR as u128)
        .unwrap_or(Amount::MAX)
}
