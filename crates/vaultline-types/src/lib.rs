//! # vaultline-types
//!
//! Shared domain types used across the Vaultline workspace.
//!
//! ## Modules
//!
//! - [`address`] — 20-byte account addresses
//! - [`strategy`] — Strategy identifiers
//! - [`units`] — Base-unit amounts and decimal conversion
//! - [`events`] — Vault event payloads
//! - [`wide`] — Overflow-free multiply-divide

pub mod address;
pub mod events;
pub mod strategy;
pub mod units;
pub mod wide;

pub use address::Address;
pub use strategy::StrategyId;
pub use units::Amount;

/// Fixed-point scale of the reward-per-share accumulator.
pub const ACC_PRECISION: u128 = 1_000_000_000_000;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Seconds in a 365-day year, used for APR accrual.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 3600;

/// Error types for parsing shared types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// A strategy id outside the known set.
    #[error("unknown strategy id {0}")]
    UnknownStrategy(u8),

    /// An address string that is not 20 hex-encoded bytes.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A decimal amount that cannot be represented in base units.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Convenience result type for shared type parsing.
pub type Result<T> = std::result::Result<T, TypesError>;
