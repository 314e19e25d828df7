// Demo data and the default badge catalog, written once into an empty store.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::analytics::report::estimated_savings;
use crate::config::SeedConfig;
use crate::models::{
    BadgeCriteria, BadgeLevel, NewBadge, PerformanceHistory, SystemMetrics, Task, TaskStatus,
    Volunteer, VolunteerStatus,
};
use crate::store::MetricsStore;

pub const DEMO_VOLUNTEERS: usize = 20;
pub const DEMO_TASKS: usize = 100;
pub const DEMO_METRIC_DAYS: i64 = 7;

#[derive(Debug, Clone, Default)]
pub struct DemoData {
    pub volunteers: Vec<Volunteer>,
    pub tasks: Vec<Task>,
    pub performance_history: Vec<PerformanceHistory>,
    pub system_metrics: Vec<SystemMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub volunteers: usize,
    pub tasks: usize,
    pub system_metrics: usize,
    pub badges: u64,
}

/// Generate a full demo data set relative to `now`.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> DemoData {
    let statuses = [
        VolunteerStatus::Active,
        VolunteerStatus::Inactive,
        VolunteerStatus::Busy,
    ];
    let volunteers: Vec<Volunteer> = (1..=DEMO_VOLUNTEERS)
        .map(|i| Volunteer {
            id: 0,
            volunteer_id: format!("vol_{:03}", i),
            name: format!("Volunteer {}", i),
            status: statuses.choose(rng).copied().unwrap_or_default(),
            joined_date: now - Duration::days(rng.gen_range(1..=800)),
            last_seen: now - Duration::minutes(rng.gen_range(0..=72 * 60)),
            tasks_completed: rng.gen_range(10..=200),
            total_computation_time: rng.gen_range(5.0..100.0),
            cpu_cores: [2, 4, 8, 16].choose(rng).copied().unwrap_or(4),
            memory_gb: [4.0, 8.0, 16.0, 32.0].choose(rng).copied().unwrap_or(8.0),
            performance_score: rng.gen_range(70.0..95.0),
        })
        .collect();

    let mut tasks = Vec::with_capacity(DEMO_TASKS);
    let mut performance_history = Vec::new();
    for i in 1..=DEMO_TASKS {
        let status = TaskStatus::ALL.choose(rng).copied().unwrap_or_default();
        let assigned_volunteer = if rng.gen_bool(0.7) {
            Some(format!("vol_{:03}", rng.gen_range(1..=DEMO_VOLUNTEERS)))
        } else {
            None
        };
        let created_date =
            now - Duration::minutes(rng.gen_range(0..DEMO_METRIC_DAYS * 24 * 60));
        let execution_time: f64 = rng.gen_range(10.0..3600.0);
        let started_date = match status {
            TaskStatus::Pending => None,
            _ => Some(created_date + Duration::seconds(rng.gen_range(1..=600))),
        };
        let completed_date = match (status, started_date) {
            (TaskStatus::Completed | TaskStatus::Failed, Some(start)) => {
                Some((start + Duration::seconds(execution_time as i64)).min(now))
            }
            _ => None,
        };
        let task = Task {
            id: 0,
            task_id: format!("task_{:04}", i),
            workflow_id: format!("workflow_{:02}", rng.gen_range(1..=10)),
            status,
            assigned_volunteer,
            created_date,
            started_date,
            completed_date,
            execution_time,
            cpu_usage: rng.gen_range(20.0..95.0),
            memory_usage: rng.gen_range(30.0..80.0),
        };
        if let (Some(volunteer_id), Some(done)) = (&task.assigned_volunteer, task.completed_date) {
            performance_history.push(PerformanceHistory {
                id: 0,
                timestamp: done,
                volunteer_id: volunteer_id.clone(),
                task_id: task.task_id.clone(),
                execution_time: task.execution_time,
                cpu_usage: task.cpu_usage,
                memory_usage: task.memory_usage,
                success: task.status == TaskStatus::Completed,
            });
        }
        tasks.push(task);
    }
    performance_history.sort_by_key(|p| p.timestamp);

    // One snapshot per hour, oldest first.
    let hours = DEMO_METRIC_DAYS * 24;
    let system_metrics = (0..hours)
        .rev()
        .map(|h| {
            let completed_tasks: i64 = rng.gen_range(800..=4500);
            SystemMetrics {
                id: 0,
                timestamp: now - Duration::hours(h),
                total_volunteers: rng.gen_range(50..=150),
                active_volunteers: rng.gen_range(20..=80),
                total_tasks: rng.gen_range(1000..=5000),
                completed_tasks,
                pending_tasks: rng.gen_range(50..=500),
                cpu_usage: rng.gen_range(30.0..85.0),
                memory_usage: rng.gen_range(40.0..90.0),
                network_throughput: rng.gen_range(100.0..1000.0),
                cost_savings: estimated_savings(completed_tasks as usize),
            }
        })
        .collect();

    DemoData {
        volunteers,
        tasks,
        performance_history,
        system_metrics,
    }
}

fn badge(
    badge_id: &str,
    name: &str,
    description: &str,
    category: &str,
    icon: &str,
    level: BadgeLevel,
    criteria: BadgeCriteria,
) -> NewBadge {
    NewBadge {
        badge_id: badge_id.into(),
        name: name.into(),
        description: description.into(),
        category: category.into(),
        icon: icon.into(),
        level,
        criteria,
    }
}

/// The 16 default catalog badges.
pub fn default_catalog() -> Vec<NewBadge> {
    use BadgeLevel::{Bronze, Gold, Silver};

    let period = |p: &str| BadgeCriteria::Period { period: p.into() };
    let tasks = |(min, max): (f64, Option<f64>)| BadgeCriteria::TasksCompleted { min, max };
    let score = |(min, max): (f64, Option<f64>)| BadgeCriteria::PerformanceScore { min, max };
    let hours = |(min, max): (f64, Option<f64>)| BadgeCriteria::ComputationTime { min, max };
    let days = |(min, max): (f64, Option<f64>)| BadgeCriteria::DaysActive { min, max };

    vec![
        badge("volunteer_of_week", "Volunteer of the Week", "Awarded to the most active volunteer of the week", "period", "🌟", Gold, period("week")),
        badge("volunteer_of_month", "Volunteer of the Month", "Awarded to the best performing volunteer of the month", "period", "⭐", Gold, period("month")),
        badge("volunteer_of_year", "Volunteer of the Year", "Awarded to the volunteer who contributed the most this year", "period", "🏆", Gold, period("year")),
        badge("participant_bronze", "Active Participant - Bronze", "Completed 50 tasks", "most_tasks", "🎯", Bronze, tasks((50.0, Some(199.0)))),
        badge("participant_silver", "Active Participant - Silver", "Completed 200 tasks", "most_tasks", "🎯", Silver, tasks((200.0, Some(499.0)))),
        badge("participant_gold", "Active Participant - Gold", "Completed 500 tasks or more", "most_tasks", "🎯", Gold, tasks((500.0, None))),
        badge("performance_silver", "Performance Excellence - Silver", "Performance score above 80%", "best_performance", "⚡", Silver, score((80.0, Some(94.9)))),
        badge("performance_gold", "Performance Excellence - Gold", "Performance score above 95%", "best_performance", "⚡", Gold, score((95.0, None))),
        badge("loyalty_bronze", "Loyal Contributor - Bronze", "50 hours of contribution", "most_connected", "⭐", Bronze, hours((50.0, Some(199.0)))),
        badge("loyalty_silver", "Loyal Contributor - Silver", "200 hours of contribution", "most_connected", "⭐", Silver, hours((200.0, Some(499.0)))),
        badge("loyalty_gold", "Loyal Contributor - Gold", "500 hours of contribution or more", "most_connected", "⭐", Gold, hours((500.0, None))),
        badge("veteran_bronze", "Veteran - Bronze", "90 days of seniority", "consistency", "🏅", Bronze, days((90.0, Some(364.0)))),
        badge("veteran_silver", "Veteran - Silver", "1 year of seniority", "consistency", "🏅", Silver, days((365.0, Some(729.0)))),
        badge("veteran_gold", "Veteran - Gold", "2 years of seniority or more", "consistency", "🏅", Gold, days((730.0, None))),
        badge("top_performer", "Top Performer", "Ranked in the top 10 volunteers", "fastest", "🚀", Gold, BadgeCriteria::Ranking { max_rank: 10 }),
        badge("speedster", "Speedster", "Very fast average execution time", "fastest", "💨", Gold, BadgeCriteria::AvgExecutionTime { percentile: 90.0 }),
    ]
}

/// Seed demo data when no volunteer exists and the catalog when no badge exists.
pub async fn seed_if_empty(
    store: &MetricsStore,
    config: &SeedConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<SeedOutcome> {
    let mut outcome = SeedOutcome::default();

    if config.demo_data && store.is_empty().await? {
        let mut rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let data = generate(&mut rng, now);
        store.insert_volunteers(&data.volunteers).await?;
        store.insert_tasks(&data.tasks).await?;
        store
            .insert_performance_history(&data.performance_history)
            .await?;
        store.insert_system_metrics(&data.system_metrics).await?;
        outcome.volunteers = data.volunteers.len();
        outcome.tasks = data.tasks.len();
        outcome.system_metrics = data.system_metrics.len();
        info!(
            volunteers = outcome.volunteers,
            tasks = outcome.tasks,
            system_metrics = outcome.system_metrics,
            "demo data seeded"
        );
    }

    if config.badges && store.badge_count().await? == 0 {
        outcome.badges = store.insert_badges(&default_catalog(), now).await?;
        info!(badges = outcome.badges, "badge catalog seeded");
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn same_seed_same_data() {
        let a = generate(&mut StdRng::seed_from_u64(7), now());
        let b = generate(&mut StdRng::seed_from_u64(7), now());
        assert_eq!(a.volunteers, b.volunteers);
        assert_eq!(a.tasks, b.tasks);
    }

    #[test]
    fn demo_data_shape() {
        let data = generate(&mut StdRng::seed_from_u64(1), now());
        assert_eq!(data.volunteers.len(), DEMO_VOLUNTEERS);
        assert_eq!(data.tasks.len(), DEMO_TASKS);
        assert_eq!(data.system_metrics.len(), (DEMO_METRIC_DAYS * 24) as usize);
        assert!(
            data.system_metrics
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp)
        );
        assert_eq!(data.system_metrics.last().map(|m| m.timestamp), Some(now()));

        for v in &data.volunteers {
            assert!((70.0..95.0).contains(&v.performance_score));
            assert!(v.joined_date < now());
        }
        for t in &data.tasks {
            assert_eq!(t.status == TaskStatus::Pending, t.started_date.is_none());
            assert_eq!(
                matches!(t.status, TaskStatus::Completed | TaskStatus::Failed),
                t.completed_date.is_some()
            );
        }
        for p in &data.performance_history {
            let task = data.tasks.iter().find(|t| t.task_id == p.task_id).unwrap();
            assert_eq!(p.success, task.status == TaskStatus::Completed);
        }
    }

    #[test]
    fn catalog_ids_are_unique() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 16);
        let ids: HashSet<&str> = catalog.iter().map(|b| b.badge_id.as_str()).collect();
        assert_eq!(ids.len(), 16);
        assert_eq!(
            catalog.iter().filter(|b| b.category == "period").count(),
            3
        );
    }
}
