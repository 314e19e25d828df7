// Shared test helpers

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use voldash::config::AppConfig;
use voldash::models::*;
use voldash::store::MetricsStore;

pub const TEST_CONFIG: &str = r#"
[server]
port = 8000
host = "127.0.0.1"

[database]
path = "data/test.db"
max_pool_size = 2

[seed]
demo_data = false
badges = false
"#;

pub fn test_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

/// Fresh schema in a temp directory. Keep the TempDir alive for the test's duration.
pub async fn temp_store() -> (TempDir, Arc<MetricsStore>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    let store = MetricsStore::connect(path.to_str().unwrap(), 2, 30)
        .await
        .unwrap();
    store.init().await.unwrap();
    (dir, Arc::new(store))
}

pub fn volunteer(
    id: &str,
    status: VolunteerStatus,
    tasks: i64,
    score: f64,
    hours: f64,
    now: DateTime<Utc>,
) -> Volunteer {
    Volunteer {
        id: 0,
        volunteer_id: id.into(),
        name: format!("Volunteer {}", id),
        status,
        joined_date: now - Duration::days(120),
        last_seen: now - Duration::hours(2),
        tasks_completed: tasks,
        total_computation_time: hours,
        cpu_cores: 8,
        memory_gb: 16.0,
        performance_score: score,
    }
}

pub fn metrics(timestamp: DateTime<Utc>, cpu: f64, memory: f64) -> SystemMetrics {
    SystemMetrics {
        total_volunteers: 3,
        active_volunteers: 2,
        total_tasks: 10,
        completed_tasks: 6,
        pending_tasks: 2,
        cpu_usage: cpu,
        memory_usage: memory,
        network_throughput: 120.0,
        ..SystemMetrics::empty(timestamp)
    }
}

pub fn task(
    id: &str,
    status: TaskStatus,
    volunteer: Option<&str>,
    created: DateTime<Utc>,
    execution_time: f64,
) -> Task {
    let finished = matches!(status, TaskStatus::Completed | TaskStatus::Failed);
    Task {
        id: 0,
        task_id: id.into(),
        workflow_id: "wf_test".into(),
        status,
        assigned_volunteer: volunteer.map(str::to_string),
        created_date: created,
        started_date: (status != TaskStatus::Pending).then(|| created + Duration::minutes(1)),
        completed_date: finished.then(|| created + Duration::minutes(10)),
        execution_time,
        cpu_usage: 50.0,
        memory_usage: 40.0,
    }
}

pub fn history(
    volunteer: &str,
    task: &str,
    timestamp: DateTime<Utc>,
    execution_time: f64,
    success: bool,
) -> PerformanceHistory {
    PerformanceHistory {
        id: 0,
        timestamp,
        volunteer_id: volunteer.into(),
        task_id: task.into(),
        execution_time,
        cpu_usage: 60.0,
        memory_usage: 45.0,
        success,
    }
}
