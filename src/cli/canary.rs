use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use heating_machine_core::canary::run_canary_with_rollback;
use heating_machine_core::config::ConfigLoader;
use heating_machine_core::env::HEATING_MACHINE_ENVIRONMENTS;

#[derive(Args)]
pub struct CanaryArgs {
    #[command(subcommand)]
    pub command: CanarySubcommand,
}

#[derive(Subcommand)]
pub enum CanarySubcommand {
    /// Run a canary rollout against a named environment profile.
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Environment profile name, e.g. "staging".
    pub environment: String,

    /// Path to the environments TOML file. Defaults to
    /// $HEATING_MACHINE_ENVIRONMENTS or ./environments.toml.
    #[arg(long)]
    pub environments: Option<PathBuf>,

    /// Path to a JSON file of telemetry fed to the pre-flight validation
    /// suite. Defaults to `{"monitoring": true}`.
    #[arg(long)]
    pub telemetry: Option<PathBuf>,

    /// Number of synthetic healthy health-gate snapshots to feed in,
    /// simulating one canary step each.
    #[arg(long, default_value_t = 4)]
    pub steps: usize,
}

pub async fn run(args: CanaryArgs) -> Result<()> {
    match args.command {
        CanarySubcommand::Run(args) => run_one(args).await,
    }
}

async fn run_one(args: RunArgs) -> Result<()> {
    let environments_path = args
        .environments
        .or_else(|| std::env::var(HEATING_MACHINE_ENVIRONMENTS).ok().map(PathBuf::from))
        .or_else(ConfigLoader::default_path)
        .unwrap_or_else(|| PathBuf::from("environments.toml"));
    let loader = ConfigLoader::new(environments_path);

    let telemetry = match args.telemetry {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading telemetry file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing telemetry file {}", path.display()))?
        }
        None => serde_json::json!({ "monitoring": true }),
    };

    // The only thing this CLI can observe locally is the telemetry and an
    // all-healthy series; a production caller would stream real health-gate
    // snapshots in from the running machine instead.
    let healthy_snapshot: HashMap<String, f64> = HashMap::new();
    let snapshots = std::iter::repeat_n(healthy_snapshot, args.steps);

    let (profile, metrics, state) =
        run_canary_with_rollback(&loader, &args.environment, snapshots, &telemetry)?;

    println!("environment:   {}", profile.name);
    println!("heat_level:    {}", state.heat_level);
    println!("last_stable:   {}", state.last_stable);
    println!("history:       {:?}", state.history);
    println!("failed:        {}", state.failed);

    let errors = metrics.latest_by_level(heating_machine_core::canary::MetricLevel::Error);
    if !errors.is_empty() {
        println!("errors:");
        for event in errors {
            println!("  - {}: {}", event.message, event.details);
        }
    }

    if state.failed {
        anyhow::bail!("canary rollout for '{}' rolled back", args.environment);
    }
    Ok(())
}
