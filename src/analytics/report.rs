// ReportCompiler: executive summary, system/task/volunteer sections and advisory rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AnalyticsError;
use super::aggregate::{aggregate, round2, summarize};
use super::field::MetricField;
use super::ranking::{RankedVolunteer, RankingMetric, rank};
use super::source::MetricsSource;
use super::trend;
use super::window::Window;
use crate::models::{
    Aggregate, PerformanceHistory, SystemMetrics, Task, TaskStatus, Trend, Volunteer,
    VolunteerStatus,
};

pub const CPU_WARNING_PERCENT: f64 = 80.0;
pub const MEMORY_WARNING_PERCENT: f64 = 80.0;
pub const FAILURE_RATE_CRITICAL_PERCENT: f64 = 10.0;
pub const ACTIVE_RATIO_INFO_PERCENT: f64 = 50.0;

/// Estimated cost of one task on conventional infrastructure, USD.
pub const COST_PER_TASK_TRADITIONAL: f64 = 0.50;
/// Coordination cost of one task on volunteer machines, USD.
pub const COST_PER_TASK_VOLUNTEER: f64 = 0.05;

pub fn estimated_savings(completed_tasks: usize) -> f64 {
    completed_tasks as f64 * (COST_PER_TASK_TRADITIONAL - COST_PER_TASK_VOLUNTEER)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemTrends {
    pub cpu_usage: Trend,
    pub memory_usage: Trend,
    pub network_throughput: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemPerformance {
    pub samples: usize,
    pub cpu_usage: Aggregate,
    pub memory_usage: Aggregate,
    pub network_throughput: Aggregate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<SystemTrends>,
}

/// Aggregates (and optionally trends) of the host telemetry fields.
pub fn system_performance(samples: &[SystemMetrics], include_trends: bool) -> SystemPerformance {
    let trends = include_trends.then(|| SystemTrends {
        cpu_usage: trend::analyze(samples, MetricField::CpuUsage),
        memory_usage: trend::analyze(samples, MetricField::MemoryUsage),
        network_throughput: trend::analyze(samples, MetricField::NetworkThroughput),
    });
    SystemPerformance {
        samples: samples.len(),
        cpu_usage: aggregate(samples, MetricField::CpuUsage),
        memory_usage: aggregate(samples, MetricField::MemoryUsage),
        network_throughput: aggregate(samples, MetricField::NetworkThroughput),
        trends,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPerformance {
    pub total: usize,
    /// Every status is present, zero when absent.
    pub by_status: BTreeMap<TaskStatus, usize>,
    /// Execution time of completed tasks only.
    pub execution_time: Aggregate,
    pub success_rate: f64,
    pub failure_rate: f64,
}

pub fn task_performance(tasks: &[Task]) -> TaskPerformance {
    let mut by_status: BTreeMap<TaskStatus, usize> =
        TaskStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    for t in tasks {
        *by_status.entry(t.status).or_default() += 1;
    }
    let completed: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .collect();
    let failed = by_status[&TaskStatus::Failed];

    TaskPerformance {
        total: tasks.len(),
        execution_time: aggregate(&completed, MetricField::ExecutionTime),
        success_rate: round2(percent(completed.len(), tasks.len())),
        failure_rate: round2(percent(failed, tasks.len())),
        by_status,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub total_volunteers: usize,
    pub active_volunteers: usize,
    pub volunteers_by_status: BTreeMap<String, usize>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub running_tasks: usize,
    pub pending_tasks: usize,
    pub failed_tasks: usize,
    pub active_volunteer_ratio: f64,
    pub cost_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolunteerPerformance {
    pub top_performers: Vec<RankedVolunteer>,
    pub average_performance_score: f64,
    pub total_computation_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    /// The measured value that triggered the rule.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub period: Window,
    pub executive_summary: ExecutiveSummary,
    pub system_performance: SystemPerformance,
    pub task_performance: TaskPerformance,
    pub volunteer_performance: VolunteerPerformance,
    pub recommendations: Vec<Recommendation>,
}

/// Everything the compiler reads, already narrowed to the report window.
#[derive(Debug, Clone, Default)]
pub struct ReportInputs {
    pub system: Vec<SystemMetrics>,
    /// Tasks created within the window.
    pub tasks: Vec<Task>,
    pub volunteers: Vec<Volunteer>,
}

/// Independent advisory rules; any subset may fire. Inputs are unrounded.
fn recommendations(
    avg_cpu: f64,
    avg_memory: f64,
    tasks: &TaskPerformance,
    total_volunteers: usize,
    active_volunteers: usize,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if avg_cpu > CPU_WARNING_PERCENT {
        out.push(Recommendation {
            severity: Severity::Warning,
            category: "cpu".into(),
            message: format!(
                "Average CPU usage is {:.1}%; consider recruiting more volunteers or spreading load",
                avg_cpu
            ),
            value: round2(avg_cpu),
        });
    }
    if avg_memory > MEMORY_WARNING_PERCENT {
        out.push(Recommendation {
            severity: Severity::Warning,
            category: "memory".into(),
            message: format!(
                "Average memory usage is {:.1}%; reduce per-task memory or favor larger hosts",
                avg_memory
            ),
            value: round2(avg_memory),
        });
    }
    if tasks.total > 0 {
        let failed = tasks.by_status.get(&TaskStatus::Failed).copied().unwrap_or(0);
        let failure_rate = percent(failed, tasks.total);
        if failure_rate > FAILURE_RATE_CRITICAL_PERCENT {
            out.push(Recommendation {
                severity: Severity::Critical,
                category: "tasks".into(),
                message: format!(
                    "Task failure rate is {:.1}%; investigate failing workflows and volunteers",
                    failure_rate
                ),
                value: round2(failure_rate),
            });
        }
    }
    if total_volunteers > 0 {
        let ratio = percent(active_volunteers, total_volunteers);
        if ratio < ACTIVE_RATIO_INFO_PERCENT {
            out.push(Recommendation {
                severity: Severity::Info,
                category: "volunteers".into(),
                message: format!(
                    "Only {:.1}% of volunteers are active; consider a re-engagement campaign",
                    ratio
                ),
                value: round2(ratio),
            });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryTrends {
    pub execution_time: Trend,
    pub cpu_usage: Trend,
    pub memory_usage: Trend,
}

/// One volunteer's performance history reduced over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPerformance {
    pub entries: usize,
    pub execution_time: Aggregate,
    pub cpu_usage: Aggregate,
    pub memory_usage: Aggregate,
    pub success_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trends: Option<HistoryTrends>,
}

pub fn history_performance(history: &[PerformanceHistory], include_trends: bool) -> HistoryPerformance {
    let succeeded = history.iter().filter(|h| h.success).count();
    HistoryPerformance {
        entries: history.len(),
        execution_time: aggregate(history, MetricField::ExecutionTime),
        cpu_usage: aggregate(history, MetricField::CpuUsage),
        memory_usage: aggregate(history, MetricField::MemoryUsage),
        success_rate: round2(percent(succeeded, history.len())),
        trends: include_trends.then(|| HistoryTrends {
            execution_time: trend::analyze(history, MetricField::ExecutionTime),
            cpu_usage: trend::analyze(history, MetricField::CpuUsage),
            memory_usage: trend::analyze(history, MetricField::MemoryUsage),
        }),
    }
}

/// Assemble a report from pre-fetched inputs. A window without system samples is no-data.
pub fn compile(
    window: Window,
    inputs: &ReportInputs,
    top_volunteers: usize,
    now: DateTime<Utc>,
) -> Result<PerformanceReport, AnalyticsError> {
    if inputs.system.is_empty() {
        return Err(AnalyticsError::NoData(format!(
            "no system metrics between {} and {}",
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        )));
    }

    let system_performance = system_performance(&inputs.system, true);
    let task_performance = task_performance(&inputs.tasks);

    let mut volunteers_by_status: BTreeMap<String, usize> = BTreeMap::new();
    for v in &inputs.volunteers {
        *volunteers_by_status.entry(v.status.to_string()).or_default() += 1;
    }
    let total_volunteers = inputs.volunteers.len();
    let active_volunteers = inputs
        .volunteers
        .iter()
        .filter(|v| v.status == VolunteerStatus::Active)
        .count();
    let count = |s: TaskStatus| task_performance.by_status.get(&s).copied().unwrap_or(0);
    let completed_tasks = count(TaskStatus::Completed);

    let executive_summary = ExecutiveSummary {
        total_volunteers,
        active_volunteers,
        volunteers_by_status,
        total_tasks: task_performance.total,
        completed_tasks,
        running_tasks: count(TaskStatus::Running),
        pending_tasks: count(TaskStatus::Pending),
        failed_tasks: count(TaskStatus::Failed),
        active_volunteer_ratio: round2(percent(active_volunteers, total_volunteers)),
        cost_savings: round2(estimated_savings(completed_tasks)),
    };

    let scores = summarize(&inputs.volunteers, MetricField::PerformanceScore);
    let hours = summarize(&inputs.volunteers, MetricField::TotalComputationTime);
    let volunteer_performance = VolunteerPerformance {
        top_performers: rank(
            &inputs.volunteers,
            RankingMetric::PerformanceScore,
            top_volunteers,
        ),
        average_performance_score: round2(scores.average),
        total_computation_time: round2(hours.total),
    };

    let recommendations = recommendations(
        summarize(&inputs.system, MetricField::CpuUsage).average,
        summarize(&inputs.system, MetricField::MemoryUsage).average,
        &task_performance,
        total_volunteers,
        active_volunteers,
    );

    Ok(PerformanceReport {
        generated_at: now,
        period: window,
        executive_summary,
        system_performance,
        task_performance,
        volunteer_performance,
        recommendations,
    })
}

/// Fetch the report inputs for `window` from `source` and compile them.
pub async fn build<S: MetricsSource>(
    source: &S,
    window: Window,
    top_volunteers: usize,
    now: DateTime<Utc>,
) -> Result<PerformanceReport, AnalyticsError> {
    let inputs = ReportInputs {
        system: source.system_metrics(window).await?,
        tasks: source.tasks(window, None).await?,
        volunteers: source.volunteers().await?,
    };
    compile(window, &inputs, top_volunteers, now)
}
