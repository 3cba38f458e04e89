//! Strategy identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// A yield strategy the vault can route deposits into.
///
/// The numeric ids are stable: `0` is staking, `1` is AMM liquidity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    /// Liquid-staking strategy.
    Staking = 0,
    /// AMM liquidity-provision strategy.
    Amm = 1,
}

impl StrategyId {
    /// Every strategy, in id order.
    pub const ALL: [StrategyId; 2] = [StrategyId::Staking, StrategyId::Amm];

    /// Position of the strategy in id-ordered tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for StrategyId {
    type Error = TypesError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StrategyId::Staking),
            1 => Ok(StrategyId::Amm),
            other => Err(TypesError::UnknownStrategy(other)),
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyId::Staking => f.write_str("staking"),
            StrategyId::Amm => f.write_str("amm"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from() {
        assert_eq!(StrategyId::try_from(0), Ok(StrategyId::Staking));
        assert_eq!(StrategyId::try_from(1), Ok(StrategyId::Amm));
        assert_eq!(StrategyId::try_from(2), Err(TypesError::UnknownStrategy(2)));
    }

    #[test]
    fn test_index_matches_all() {
        for (i, s) in StrategyId::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }
}
