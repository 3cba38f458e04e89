//! Scenario file format.
//!
//! ```toml
//! name = "two users"
//!
//! [vault.limits]
//! min_deposit = 1
//!
//! [sources]
//! staking_apr_bps = 400
//! amm_fee_apr_bps = 600
//! amm_max_exit_bps = 10000
//!
//! [[step]]
//! action = "mint"
//! to = "alice"
//! amount = "1000"
//!
//! [[step]]
//! action = "deposit"
//! user = "alice"
//! strategy = 0
//! amount = "250.5"
//! ```
//!
//! Accounts are named by label; each label maps to a derived address.
//! Amounts are decimal strings in whole tokens.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use vaultline_source::amm::{DEFAULT_FEE_APR_BPS, DEFAULT_MAX_EXIT_BPS};
use vaultline_source::staking::DEFAULT_STAKING_APR_BPS;
use vaultline_vault::VaultConfig;

/// A parsed scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Name echoed in the report.
    #[serde(default = "default_name")]
    pub name: String,
    /// Vault configuration.
    #[serde(default)]
    pub vault: VaultConfig,
    /// Yield-source parameters.
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Steps, run in order.
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

/// Yield-source parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub staking_apr_bps: u32,
    pub amm_fee_apr_bps: u32,
    pub amm_max_exit_bps: u16,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            staking_apr_bps: DEFAULT_STAKING_APR_BPS,
            amm_fee_apr_bps: DEFAULT_FEE_APR_BPS,
            amm_max_exit_bps: DEFAULT_MAX_EXIT_BPS,
        }
    }
}

/// One scenario action.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Credit `amount` of the base asset to `to`.
    Mint { to: String, amount: String },
    /// `owner` approves the vault for `amount`, or without limit if omitted.
    Approve {
        owner: String,
        #[serde(default)]
        amount: Option<String>,
    },
    Deposit {
        user: String,
        strategy: u8,
        amount: String,
    },
    Withdraw {
        user: String,
        strategy: u8,
        amount: String,
    },
    /// Claim one strategy, or every strategy if `strategy` is omitted.
    Claim {
        user: String,
        #[serde(default)]
        strategy: Option<u8>,
    },
    /// Rebase credit of `amount` straight to a strategy's source.
    Accrue { strategy: u8, amount: String },
    /// Burn `amount` from a strategy's source.
    Impair { strategy: u8, amount: String },
    /// Let `seconds` pass: both sources earn their configured APR.
    Advance { seconds: u64 },
    /// Refresh a strategy without any other mutation.
    Refresh { strategy: u8 },
}

impl Step {
    /// Action name as written in the scenario.
    pub fn action(&self) -> &'static str {
        match self {
            Step::Mint { .. } => "mint",
            Step::Approve { .. } => "approve",
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::Claim { .. } => "claim",
            Step::Accrue { .. } => "accrue",
            Step::Impair { .. } => "impair",
            Step::Advance { .. } => "advance",
            Step::Refresh { .. } => "refresh",
        }
    }

    /// Account labels the step refers to.
    pub fn accounts(&self) -> Vec<&str> {
        match self {
            Step::Mint { to, .. } => vec![to.as_str()],
            Step::Approve { owner, .. } => vec![owner.as_str()],
            Step::Deposit { user, .. } | Step::Withdraw { user, .. } | Step::Claim { user, .. } => {
                vec![user.as_str()]
            }
            Step::Accrue { .. } | Step::Impair { .. } | Step::Advance { .. } | Step::Refresh { .. } => {
                Vec::new()
            }
        }
    }
}

fn default_name() -> String {
    "unnamed".to_string()
}

impl Scenario {
    /// Parse a scenario from TOML.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = toml::from_str(content).context("parse scenario")?;
        scenario
            .vault
            .validate()
            .context("invalid [vault] configuration")?;
        Ok(scenario)
    }

    /// Load a scenario file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}
