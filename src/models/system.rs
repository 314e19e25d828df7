// Platform-wide telemetry snapshot (one row per sample in system_metrics).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Row id; 0 until persisted.
    #[serde(default)]
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub total_volunteers: i64,
    pub active_volunteers: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub pending_tasks: i64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub network_throughput: f64,
    pub cost_savings: f64,
}

impl SystemMetrics {
    /// Zero-valued snapshot at `timestamp`, convenient for building samples field by field.
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            timestamp,
            total_volunteers: 0,
            active_volunteers: 0,
            total_tasks: 0,
            completed_tasks: 0,
            pending_tasks: 0,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            network_throughput: 0.0,
            cost_savings: 0.0,
        }
    }
}
