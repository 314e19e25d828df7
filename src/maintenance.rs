// Background maintenance: prune rows past retention every prune_interval_secs.
// VACUUM runs on a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::config::MaintenanceConfig;
use crate::store::MetricsStore;

/// Spawns the maintenance worker. Returns a join handle.
pub fn spawn(
    store: Arc<MetricsStore>,
    config: MaintenanceConfig,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(store, config, shutdown_rx).await;
    })
}

#[instrument(skip(store, shutdown_rx), fields(prune_interval_secs = config.prune_interval_secs))]
async fn run(
    store: Arc<MetricsStore>,
    config: MaintenanceConfig,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let mut prune_interval = tokio::time::interval(Duration::from_secs(config.prune_interval_secs));
    prune_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    let scheduler = tokio::spawn(vacuum_scheduler(config.clone(), vacuum_tx));

    loop {
        tokio::select! {
            _ = prune_interval.tick() => {
                match store.prune_old_data(Utc::now()).await {
                    Ok(0) => {}
                    Ok(rows) => info!(rows, "pruned rows past retention"),
                    Err(e) => warn!(error = %e, "prune failed"),
                }
            }
            Some(()) = vacuum_rx.recv() => {
                if let Err(e) = store.vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Maintenance worker shutting down");
                break;
            }
        }
    }
    scheduler.abort();
}

/// Time until the next VACUUM: next cron fire (local time) or the fixed interval.
pub fn next_vacuum_delay(
    config: &MaintenanceConfig,
    now: chrono::DateTime<chrono::Local>,
) -> anyhow::Result<Duration> {
    match config.vacuum_schedule {
        Some(ref cron_str) => {
            let schedule = cron::Schedule::from_str(cron_str)
                .map_err(|e| anyhow::anyhow!("invalid vacuum_schedule {:?}: {}", cron_str, e))?;
            let next = schedule
                .after(&now)
                .next()
                .ok_or_else(|| anyhow::anyhow!("vacuum_schedule {:?} never fires", cron_str))?;
            Ok((next - now).to_std().unwrap_or(Duration::from_secs(1)))
        }
        None => Ok(Duration::from_secs(config.vacuum_interval_secs)),
    }
}

/// Sends a message on `tx` at each VACUUM time.
async fn vacuum_scheduler(config: MaintenanceConfig, tx: tokio::sync::mpsc::Sender<()>) {
    loop {
        let delay = match next_vacuum_delay(&config, chrono::Local::now()) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "VACUUM will not run");
                return;
            }
        };
        tokio::time::sleep(delay).await;
        if tx.send(()).await.is_err() {
            break;
        }
    }
}
