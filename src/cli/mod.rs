pub mod canary;
pub mod config;
pub mod serve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "heating-machine", version, about = "A sensor-gated, heartbeat-monitored work queue with canary rollout and safety envelope")]
pub struct Cli {
    /// Enable debug-level logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server, load engine, and work queue.
    Serve(serve::ServeArgs),
    /// Canary rollout operations.
    Canary(canary::CanaryArgs),
    /// Config validation operations.
    Config(config::ConfigArgs),
}
