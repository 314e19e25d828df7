// Host load via sysinfo: CPU %, memory %, network KB/s.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use sysinfo::{Networks, System};
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    /// KB/s received plus transmitted since the previous sample.
    pub network_throughput: f64,
}

pub struct HostReader {
    sys: Arc<Mutex<System>>,
    networks: Arc<Mutex<(Networks, Instant)>>,
}

impl Default for HostReader {
    fn default() -> Self {
        Self::new()
    }
}

impl HostReader {
    pub fn new() -> Self {
        let mut sys = System::new();
        // First CPU refresh only establishes the baseline.
        sys.refresh_cpu_all();
        sys.refresh_memory();
        let networks = Networks::new_with_refreshed_list();
        Self {
            sys: Arc::new(Mutex::new(sys)),
            networks: Arc::new(Mutex::new((networks, Instant::now()))),
        }
    }

    #[instrument(skip(self), fields(repo = "host", operation = "sample"))]
    pub async fn sample(&self) -> anyhow::Result<HostSample> {
        let sys = self.sys.clone();
        let networks = self.networks.clone();
        tokio::task::spawn_blocking(move || {
            let (cpu_usage, memory_usage) = {
                let mut sys = sys
                    .lock()
                    .map_err(|e| anyhow::anyhow!("sysinfo lock poisoned: {}", e))?;
                sys.refresh_cpu_all();
                sys.refresh_memory();
                let total = sys.total_memory();
                let used = total.saturating_sub(sys.available_memory());
                let memory = if total > 0 {
                    used as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                (sys.global_cpu_usage() as f64, memory)
            };

            let mut guard = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            let (networks, last_refresh) = &mut *guard;
            networks.refresh(true);
            let now = Instant::now();
            let elapsed = now.duration_since(*last_refresh).as_secs_f64();
            *last_refresh = now;
            let bytes: u64 = networks
                .list()
                .values()
                .map(|data| data.received() + data.transmitted())
                .sum();
            let network_throughput = if elapsed > 0.0 {
                bytes as f64 / 1024.0 / elapsed
            } else {
                0.0
            };

            Ok(HostSample {
                cpu_usage: cpu_usage.clamp(0.0, 100.0),
                memory_usage: memory_usage.clamp(0.0, 100.0),
                network_throughput,
            })
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}
