//! Worker mode
//!
//! Runs only the reminder loop, for deployments that keep the HTTP API
//! and the worker in separate processes.

use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::get_config;
use crate::runtime::lifetime;
use crate::services::{Notifiers, ReminderWorker};

/// Run the reminder worker until Ctrl+C / SIGTERM
///
/// `interval` overrides `worker.poll_interval_secs`.
pub async fn run_worker(interval: Option<u64>) -> Result<()> {
    let config = get_config();
    let storage = lifetime::startup::prepare_storage().await?;

    if config.worker.embedded {
        warn!(
            "worker.embedded is enabled: a running server already checks reminders, \
             reminders are claimed atomically so running both is safe"
        );
    }

    let poll_interval = Duration::from_secs(
        interval
            .unwrap_or(config.worker.poll_interval_secs)
            .max(1),
    );

    let worker = ReminderWorker::new(storage.clone(), Notifiers::from_config(&config))
        .with_daily_rollover(config.worker.daily_rollover);

    worker
        .run(poll_interval, lifetime::shutdown::wait_for_signal())
        .await;

    if let Err(e) = storage.get_db().clone().close().await {
        warn!("Failed to close database pool: {}", e);
    }
    info!("Reminder worker exited");
    Ok(())
}
