//! Background task scheduler for periodic graph rebuilds
//!
//! Enabled via environment variables:
//!
//! - `TALLY_GRAPH_SCHEDULE`: Interval in hours between full rebuilds (0 disables)
//! - `TALLY_GRAPH_TIMEOUT_SECS`: Per-user rebuild deadline in seconds (default: 300)
//!
//! Each tick rebuilds every user that has transactions. A failure for one
//! user is logged and does not stop the others.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::graph::GraphService;

pub const SCHEDULE_ENV: &str = "TALLY_GRAPH_SCHEDULE";
pub const TIMEOUT_ENV: &str = "TALLY_GRAPH_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for scheduled rebuilds
#[derive(Debug, Clone, PartialEq)]
pub struct GraphScheduleConfig {
    /// Interval between rebuild passes in hours
    pub interval_hours: u64,
    /// Deadline applied to each user's rebuild
    pub user_timeout: Duration,
}

impl GraphScheduleConfig {
    /// Schedule with the default per-user deadline
    pub fn new(interval_hours: u64) -> Self {
        Self {
            interval_hours,
            user_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Parse configuration from environment variables
    ///
    /// Returns None if scheduling is not configured (TALLY_GRAPH_SCHEDULE not set)
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let interval_hours: u64 = lookup(SCHEDULE_ENV).and_then(|s| s.parse().ok())?;

        if interval_hours == 0 {
            warn!("{} is 0, scheduled graph rebuilds disabled", SCHEDULE_ENV);
            return None;
        }

        let timeout_secs = lookup(TIMEOUT_ENV)
            .and_then(|s| s.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Some(Self {
            interval_hours,
            user_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Start the rebuild scheduler as a background task
///
/// The first pass runs one full interval after startup.
pub fn start_graph_scheduler(
    service: Arc<GraphService>,
    config: GraphScheduleConfig,
) -> JoinHandle<()> {
    info!(
        "Starting graph scheduler: every {} hours, {:?} per user",
        config.interval_hours, config.user_timeout
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_hours * 3600));
        ticker.tick().await;

        loop {
            ticker.tick().await;
            run_scheduled_rebuild(&service, config.user_timeout).await;
        }
    })
}

/// Run one rebuild pass over all users, returning how many succeeded
pub async fn run_scheduled_rebuild(service: &Arc<GraphService>, user_timeout: Duration) -> usize {
    info!("Running scheduled graph rebuild...");

    let results = match service.rebuild_all(Some(user_timeout)).await {
        Ok(results) => results,
        Err(e) => {
            error!("Scheduled graph rebuild failed: {}", e);
            return 0;
        }
    };

    let mut ok = 0;
    for (user_id, result) in results {
        match result {
            Ok(written) => {
                ok += 1;
                info!(user_id, written, "Scheduled rebuild completed");
            }
            Err(e) => error!(user_id, "Scheduled rebuild failed: {}", e),
        }
    }
    ok
}
