//! vaultline-sim: back-test harness for the vault.
//!
//! Loads a TOML scenario, runs its steps against a fresh in-memory vault
//! and prints a JSON report to stdout. Logs go to stderr. If
//! `VAULTLINE_CONFIG` names a file, it replaces the scenario's `[vault]`
//! table.
//!
//! ```text
//! vaultline-sim crates/vaultline-sim/scenarios/compounding.toml
//! ```

mod runner;
mod scenario;

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use vaultline_vault::VaultConfig;

use crate::runner::Runner;
use crate::scenario::Scenario;

fn main() -> anyhow::Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: vaultline-sim <scenario.toml>")?;
    let mut scenario = Scenario::load(&path)?;
    scenario.vault =
        VaultConfig::resolve(scenario.vault).context("load VAULTLINE_CONFIG override")?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("vaultline={}", scenario.vault.logging.level).parse()?),
        )
        .init();

    info!(scenario = %scenario.name, steps = scenario.steps.len(), "vaultline-sim starting");

    let report = Runner::new(&scenario)?.run(&scenario.steps)?;
    let failed = report.steps.iter().filter(|s| !s.ok).count();
    println!("{}", serde_json::to_string_pretty(&report)?);

    info!(failed, "vaultline-sim finished");
    Ok(())
}
