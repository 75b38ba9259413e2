use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use heating_machine_core::config::MachineConfig;
use heating_machine_core::env::HEATING_MACHINE_CONFIG;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Load and validate a machine config file, printing the resolved values.
    Check(CheckArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// Path to the machine config TOML file. Defaults to
    /// $HEATING_MACHINE_CONFIG or ./machine.toml.
    pub path: Option<PathBuf>,
}

pub async fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigSubcommand::Check(args) => check(args).await,
    }
}

async fn check(args: CheckArgs) -> Result<()> {
    let path = args
        .path
        .or_else(|| std::env::var(HEATING_MACHINE_CONFIG).ok().map(PathBuf::from))
        .or_else(MachineConfig::default_path)
        .unwrap_or_else(|| PathBuf::from("machine.toml"));

    let config = MachineConfig::load(&path)
        .with_context(|| format!("loading machine config {}", path.display()))?;

    println!("config ok: {}", path.display());
    println!("  max_load:                 {}", config.max_load);
    println!("  max_runtime_seconds:      {}", config.max_runtime_seconds);
    println!("  sensor_threshold:         {}", config.sensor_threshold);
    println!("  max_temperature:          {}", config.max_temperature);
    println!("  heartbeat_timeout_seconds: {}", config.heartbeat_timeout_seconds);
    Ok(())
}
