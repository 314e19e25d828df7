// Typed field selector: each known numeric field, and how every record type exposes it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use super::AnalyticsError;
use crate::models::{PerformanceHistory, SystemMetrics, Task, Volunteer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    CpuUsage,
    MemoryUsage,
    NetworkThroughput,
    TotalVolunteers,
    ActiveVolunteers,
    TotalTasks,
    CompletedTasks,
    PendingTasks,
    CostSavings,
    ExecutionTime,
    TasksCompleted,
    PerformanceScore,
    TotalComputationTime,
}

impl MetricField {
    pub const ALL: [MetricField; 13] = [
        MetricField::CpuUsage,
        MetricField::MemoryUsage,
        MetricField::NetworkThroughput,
        MetricField::TotalVolunteers,
        MetricField::ActiveVolunteers,
        MetricField::TotalTasks,
        MetricField::CompletedTasks,
        MetricField::PendingTasks,
        MetricField::CostSavings,
        MetricField::ExecutionTime,
        MetricField::TasksCompleted,
        MetricField::PerformanceScore,
        MetricField::TotalComputationTime,
    ];

    /// Wire name, identical to the JSON key of the field.
    pub fn name(&self) -> &'static str {
        match self {
            MetricField::CpuUsage => "cpu_usage",
            MetricField::MemoryUsage => "memory_usage",
            MetricField::NetworkThroughput => "network_throughput",
            MetricField::TotalVolunteers => "total_volunteers",
            MetricField::ActiveVolunteers => "active_volunteers",
            MetricField::TotalTasks => "total_tasks",
            MetricField::CompletedTasks => "completed_tasks",
            MetricField::PendingTasks => "pending_tasks",
            MetricField::CostSavings => "cost_savings",
            MetricField::ExecutionTime => "execution_time",
            MetricField::TasksCompleted => "tasks_completed",
            MetricField::PerformanceScore => "performance_score",
            MetricField::TotalComputationTime => "total_computation_time",
        }
    }

    /// Whether a decrease of this field counts as an improvement.
    pub fn lower_is_better(&self) -> bool {
        matches!(
            self,
            MetricField::CpuUsage
                | MetricField::MemoryUsage
                | MetricField::ExecutionTime
                | MetricField::PendingTasks
        )
    }
}

impl fmt::Display for MetricField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricField {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| AnalyticsError::UnknownMetric(s.to_string()))
    }
}

/// A time-stamped record carrying zero or more named numeric fields.
pub trait Sample {
    fn timestamp(&self) -> DateTime<Utc>;

    /// The raw field, or None when this record shape does not carry it.
    fn field(&self, field: MetricField) -> Option<f64>;

    /// Field value with absent fields read as zero.
    fn value(&self, field: MetricField) -> f64 {
        self.field(field).unwrap_or(0.0)
    }
}

impl<S: Sample + ?Sized> Sample for &S {
    fn timestamp(&self) -> DateTime<Utc> {
        (**self).timestamp()
    }

    fn field(&self, field: MetricField) -> Option<f64> {
        (**self).field(field)
    }
}

impl Sample for SystemMetrics {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn field(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::CpuUsage => Some(self.cpu_usage),
            MetricField::MemoryUsage => Some(self.memory_usage),
            MetricField::NetworkThroughput => Some(self.network_throughput),
            MetricField::TotalVolunteers => Some(self.total_volunteers as f64),
            MetricField::ActiveVolunteers => Some(self.active_volunteers as f64),
            MetricField::TotalTasks => Some(self.total_tasks as f64),
            MetricField::CompletedTasks => Some(self.completed_tasks as f64),
            MetricField::PendingTasks => Some(self.pending_tasks as f64),
            MetricField::CostSavings => Some(self.cost_savings),
            _ => None,
        }
    }
}

impl Sample for PerformanceHistory {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn field(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::ExecutionTime => Some(self.execution_time),
            MetricField::CpuUsage => Some(self.cpu_usage),
            MetricField::MemoryUsage => Some(self.memory_usage),
            _ => None,
        }
    }
}

impl Sample for Task {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_date
    }

    fn field(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::ExecutionTime => Some(self.execution_time),
            MetricField::CpuUsage => Some(self.cpu_usage),
            MetricField::MemoryUsage => Some(self.memory_usage),
            _ => None,
        }
    }
}

impl Sample for Volunteer {
    fn timestamp(&self) -> DateTime<Utc> {
        self.last_seen
    }

    fn field(&self, field: MetricField) -> Option<f64> {
        match field {
            MetricField::TasksCompleted => Some(self.tasks_completed as f64),
            MetricField::PerformanceScore => Some(self.performance_score),
            MetricField::TotalComputationTime => Some(self.total_computation_time),
            _ => None,
        }
    }
}
