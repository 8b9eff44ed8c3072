//! Schedule command - run periodic graph rebuilds in the foreground

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use tally_core::scheduler::SCHEDULE_ENV;
use tally_core::{start_graph_scheduler, GraphScheduleConfig, GraphService};

/// Effective schedule: `--interval-hours` wins over the environment
pub fn resolve_schedule(interval_hours: Option<u64>) -> Option<GraphScheduleConfig> {
    let env = GraphScheduleConfig::from_env();
    match interval_hours {
        Some(0) => None,
        Some(hours) => {
            let mut config = env.unwrap_or_else(|| GraphScheduleConfig::new(hours));
            config.interval_hours = hours;
            Some(config)
        }
        None => env,
    }
}

pub async fn cmd_schedule(service: Arc<GraphService>, interval_hours: Option<u64>) -> Result<()> {
    let Some(config) = resolve_schedule(interval_hours) else {
        anyhow::bail!(
            "No rebuild schedule configured. Set {} (hours) or pass --interval-hours",
            SCHEDULE_ENV
        );
    };

    println!(
        "⏱️  Rebuilding all graphs every {} hour(s). Press Ctrl-C to stop.",
        config.interval_hours
    );

    let handle = start_graph_scheduler(service, config);
    tokio::signal::ctrl_c().await?;

    info!("Stopping graph scheduler");
    handle.abort();
    Ok(())
}
