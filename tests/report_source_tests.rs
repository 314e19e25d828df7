// Report building against an in-memory MetricsSource

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::*;
use voldash::analytics::report::{self, Severity};
use voldash::analytics::{AnalyticsError, MetricsSource, Window};
use voldash::models::*;

#[derive(Default)]
struct MemorySource {
    system: Vec<SystemMetrics>,
    history: Vec<PerformanceHistory>,
    tasks: Vec<Task>,
    volunteers: Vec<Volunteer>,
}

impl MetricsSource for MemorySource {
    async fn system_metrics(&self, window: Window) -> anyhow::Result<Vec<SystemMetrics>> {
        Ok(self
            .system
            .iter()
            .filter(|m| window.contains(m.timestamp))
            .cloned()
            .collect())
    }

    async fn performance_history(
        &self,
        window: Window,
        volunteer_id: Option<&str>,
    ) -> anyhow::Result<Vec<PerformanceHistory>> {
        Ok(self
            .history
            .iter()
            .filter(|h| window.contains(h.timestamp))
            .filter(|h| volunteer_id.is_none_or(|id| h.volunteer_id == id))
            .cloned()
            .collect())
    }

    async fn tasks(
        &self,
        window: Window,
        status: Option<TaskStatus>,
    ) -> anyhow::Result<Vec<Task>> {
        Ok(self
            .tasks
            .iter()
            .filter(|t| window.contains(t.created_date))
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect())
    }

    async fn volunteers(&self) -> anyhow::Result<Vec<Volunteer>> {
        Ok(self.volunteers.clone())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, 20, 18, 0, 0).unwrap()
}

fn day() -> Window {
    Window::ending_at(now(), Duration::days(1))
}

fn busy_source() -> MemorySource {
    MemorySource {
        system: vec![
            metrics(now() - Duration::days(3), 10.0, 10.0),
            metrics(now() - Duration::hours(6), 85.0, 50.0),
            metrics(now() - Duration::hours(1), 95.0, 60.0),
        ],
        history: vec![],
        tasks: vec![
            task("t1", TaskStatus::Completed, Some("vol_a"), now() - Duration::hours(5), 100.0),
            task("t2", TaskStatus::Failed, Some("vol_b"), now() - Duration::hours(4), 30.0),
            task("t3", TaskStatus::Pending, None, now() - Duration::hours(3), 0.0),
            task("t4", TaskStatus::Completed, Some("vol_a"), now() - Duration::days(5), 100.0),
        ],
        volunteers: vec![
            volunteer("vol_a", VolunteerStatus::Active, 120, 92.0, 40.0, now()),
            volunteer("vol_b", VolunteerStatus::Inactive, 30, 70.0, 8.0, now()),
            volunteer("vol_c", VolunteerStatus::Inactive, 5, 60.0, 1.0, now()),
        ],
    }
}

#[tokio::test]
async fn test_report_reads_only_the_window() {
    let source = busy_source();
    let r = report::build(&source, day(), 2, now()).await.unwrap();

    assert_eq!(r.period, day());
    assert_eq!(r.generated_at, now());
    assert_eq!(r.system_performance.samples, 2);
    assert_eq!(r.system_performance.cpu_usage.average, 90.0);
    assert_eq!(r.task_performance.total, 3);
    assert_eq!(r.executive_summary.completed_tasks, 1);
    assert_eq!(r.executive_summary.failed_tasks, 1);
    assert_eq!(r.executive_summary.pending_tasks, 1);
    assert_eq!(r.executive_summary.total_volunteers, 3);
    assert_eq!(r.executive_summary.active_volunteers, 1);
    assert_eq!(r.executive_summary.cost_savings, 0.45);
    assert_eq!(r.volunteer_performance.top_performers.len(), 2);
    assert_eq!(
        r.volunteer_performance.top_performers[0].volunteer.volunteer_id,
        "vol_a"
    );
}

#[tokio::test]
async fn test_report_recommendations_fire_on_thresholds() {
    let source = busy_source();
    let r = report::build(&source, day(), 5, now()).await.unwrap();
    let categories: Vec<&str> = r
        .recommendations
        .iter()
        .map(|rec| rec.category.as_str())
        .collect();
    assert!(categories.contains(&"cpu"));
    assert!(!categories.contains(&"memory"));
    assert!(categories.contains(&"tasks"));
    assert!(categories.contains(&"volunteers"));

    let tasks = r
        .recommendations
        .iter()
        .find(|rec| rec.category == "tasks")
        .unwrap();
    assert_eq!(tasks.severity, Severity::Critical);
}

#[tokio::test]
async fn test_cpu_exactly_at_threshold_does_not_warn() {
    let source = MemorySource {
        system: vec![
            metrics(now() - Duration::hours(2), 70.0, 20.0),
            metrics(now() - Duration::hours(1), 90.0, 20.0),
        ],
        volunteers: vec![volunteer("vol_a", VolunteerStatus::Active, 1, 80.0, 1.0, now())],
        ..Default::default()
    };
    let r = report::build(&source, day(), 5, now()).await.unwrap();
    assert_eq!(r.system_performance.cpu_usage.average, 80.0);
    assert!(r.recommendations.iter().all(|rec| rec.category != "cpu"));
}

#[tokio::test]
async fn test_report_without_samples_is_no_data() {
    let source = MemorySource {
        volunteers: vec![volunteer("vol_a", VolunteerStatus::Active, 1, 80.0, 1.0, now())],
        ..Default::default()
    };
    let err = report::build(&source, day(), 5, now()).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::NoData(_)));
}

#[tokio::test]
async fn test_volunteer_history_through_source() {
    let source = MemorySource {
        history: vec![
            history("vol_a", "t1", now() - Duration::hours(3), 100.0, true),
            history("vol_a", "t2", now() - Duration::hours(2), 150.0, false),
            history("vol_b", "t3", now() - Duration::hours(2), 10.0, true),
        ],
        ..Default::default()
    };
    let entries = source
        .performance_history(day(), Some("vol_a"))
        .await
        .unwrap();
    let perf = report::history_performance(&entries, true);
    assert_eq!(perf.entries, 2);
    assert_eq!(perf.execution_time.average, 125.0);
    assert_eq!(perf.success_rate, 50.0);
    let trends = perf.trends.unwrap();
    assert_eq!(trends.execution_time.trend, TrendDirection::Increasing);
}
