// Repository seam between the analytics core and whatever stores the samples.

use std::future::Future;

use super::window::Window;
use crate::models::{PerformanceHistory, SystemMetrics, Task, TaskStatus, Volunteer};

/// Time-series reads the analytics core depends on. Every sequence is ordered by
/// timestamp ascending and filtered with inclusive window bounds.
pub trait MetricsSource {
    fn system_metrics(
        &self,
        window: Window,
    ) -> impl Future<Output = anyhow::Result<Vec<SystemMetrics>>> + Send;

    fn performance_history(
        &self,
        window: Window,
        volunteer_id: Option<&str>,
    ) -> impl Future<Output = anyhow::Result<Vec<PerformanceHistory>>> + Send;

    /// Tasks created within the window.
    fn tasks(
        &self,
        window: Window,
        status: Option<TaskStatus>,
    ) -> impl Future<Output = anyhow::Result<Vec<Task>>> + Send;

    fn volunteers(&self) -> impl Future<Output = anyhow::Result<Vec<Volunteer>>> + Send;
}
