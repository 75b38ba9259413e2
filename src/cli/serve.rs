use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use heating_machine_core::loadgen::LoadEngine;
use heating_machine_core::workqueue::{Metrics, WorkQueue};
use heating_machine_server::Server;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Work queue bounded capacity.
    #[arg(long, default_value_t = 64)]
    pub queue_capacity: usize,

    /// Work queue worker concurrency.
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Load engine control loop tick interval, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub control_interval_ms: u64,

    /// Load engine guardrail ceiling, 0.0-1.0.
    #[arg(long, default_value_t = 0.9)]
    pub max_safe_load: f64,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let metrics = Metrics::new();
    let queue: WorkQueue<()> = WorkQueue::with_metrics(args.queue_capacity, args.concurrency, metrics.clone());
    queue.start().await;

    let load_engine = LoadEngine::new(
        Duration::from_millis(args.control_interval_ms),
        args.max_safe_load,
        args.queue_capacity,
    );
    load_engine.start().await;

    let server = Server::new(load_engine.clone(), metrics);

    tokio::select! {
        result = server.serve(args.bind) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    load_engine.stop().await;
    queue.stop().await;
    Ok(())
}
