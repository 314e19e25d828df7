// Background sampler: one system_metrics row per tick from host load and store counts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{Duration, interval};

use crate::analytics::report::estimated_savings;
use crate::host::{HostReader, HostSample};
use crate::models::SystemMetrics;
use crate::store::{MetricsStore, StoreCounts};

pub struct SamplerDeps {
    pub reader: Arc<HostReader>,
    pub store: Arc<MetricsStore>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Snapshot row for `now` from a host sample and the live store counts.
pub fn snapshot(now: DateTime<Utc>, host: HostSample, counts: StoreCounts) -> SystemMetrics {
    SystemMetrics {
        id: 0,
        timestamp: now,
        total_volunteers: counts.total_volunteers,
        active_volunteers: counts.active_volunteers,
        total_tasks: counts.total_tasks,
        completed_tasks: counts.completed_tasks,
        pending_tasks: counts.pending_tasks,
        cpu_usage: host.cpu_usage,
        memory_usage: host.memory_usage,
        network_throughput: host.network_throughput,
        cost_savings: estimated_savings(counts.completed_tasks.max(0) as usize),
    }
}

async fn sample_once(reader: &HostReader, store: &MetricsStore) -> anyhow::Result<SystemMetrics> {
    let host = reader.sample().await?;
    let counts = store.counts().await?;
    let row = snapshot(Utc::now(), host, counts);
    store.insert_system_metrics(std::slice::from_ref(&row)).await?;
    Ok(row)
}

pub fn spawn(deps: SamplerDeps, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    let SamplerDeps {
        reader,
        store,
        mut shutdown_rx,
    } = deps;

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(interval_secs, "sampler started");

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match sample_once(&reader, &store).await {
                        Ok(row) => tracing::debug!(
                            operation = "sample",
                            cpu_usage = row.cpu_usage,
                            memory_usage = row.memory_usage,
                            "system snapshot saved"
                        ),
                        Err(e) => tracing::warn!(
                            error = %e,
                            operation = "sample",
                            "system snapshot failed"
                        ),
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Sampler shutting down");
                    break;
                }
            }
        }
    })
}
