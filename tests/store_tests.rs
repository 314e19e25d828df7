// MetricsStore tests: schema, inserts, windowed reads, badges, prune

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::*;
use voldash::analytics::badges::Award;
use voldash::analytics::{MetricsSource, Window};
use voldash::models::*;
use voldash::seed::default_catalog;
use voldash::store::AttributionFilter;

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

#[tokio::test]
async fn test_init_is_idempotent_and_store_starts_empty() {
    let (_dir, store) = temp_store().await;
    store.init().await.unwrap();
    assert!(store.is_empty().await.unwrap());
    assert!(store.latest_system_metrics().await.unwrap().is_none());
    assert_eq!(store.badge_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_system_metrics_window_is_inclusive_and_ascending() {
    let (_dir, store) = temp_store().await;
    let samples: Vec<SystemMetrics> = (0..5)
        .rev()
        .map(|i| metrics(t0() + Duration::hours(i), 10.0 * i as f64, 30.0))
        .collect();
    store.insert_system_metrics(&samples).await.unwrap();

    let window = Window::new(t0() + Duration::hours(1), t0() + Duration::hours(3));
    let got = store.system_metrics(window).await.unwrap();
    let cpu: Vec<f64> = got.iter().map(|m| m.cpu_usage).collect();
    assert_eq!(cpu, vec![10.0, 20.0, 30.0]);

    let latest = store.latest_system_metrics().await.unwrap().unwrap();
    assert_eq!(latest.timestamp, t0() + Duration::hours(4));
    assert!(latest.id > 0);
}

#[tokio::test]
async fn test_volunteers_roundtrip_and_lookup() {
    let (_dir, store) = temp_store().await;
    let vols = vec![
        volunteer("vol_a", VolunteerStatus::Active, 40, 88.5, 12.5, t0()),
        volunteer("vol_b", VolunteerStatus::Busy, 10, 72.0, 3.0, t0()),
    ];
    store.insert_volunteers(&vols).await.unwrap();
    assert!(!store.is_empty().await.unwrap());

    let listed = store.list_volunteers().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].volunteer_id, "vol_a");
    assert_eq!(listed[1].status, VolunteerStatus::Busy);

    let b = store.get_volunteer("vol_b").await.unwrap().unwrap();
    assert_eq!(b.performance_score, 72.0);
    assert_eq!(b.joined_date, vols[1].joined_date);
    assert!(store.get_volunteer("vol_zz").await.unwrap().is_none());
}

#[tokio::test]
async fn test_tasks_filters_and_counts() {
    let (_dir, store) = temp_store().await;
    store
        .insert_volunteers(&[volunteer("vol_a", VolunteerStatus::Active, 1, 80.0, 1.0, t0())])
        .await
        .unwrap();
    let tasks = vec![
        task("t1", TaskStatus::Completed, Some("vol_a"), t0(), 100.0),
        task("t2", TaskStatus::Completed, Some("vol_a"), t0() + Duration::hours(1), 200.0),
        task("t3", TaskStatus::Pending, None, t0() + Duration::hours(2), 0.0),
        task("t4", TaskStatus::Failed, Some("vol_a"), t0() - Duration::days(3), 50.0),
    ];
    store.insert_tasks(&tasks).await.unwrap();

    let completed = store
        .list_tasks(Some(TaskStatus::Completed), 100)
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
    assert_eq!(completed[0].task_id, "t2");

    let limited = store.list_tasks(None, 1).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].task_id, "t3");

    let window = Window::new(t0(), t0() + Duration::hours(2));
    let in_window = store.tasks(window, None).await.unwrap();
    assert_eq!(in_window.len(), 3);
    let pending = store
        .tasks(window, Some(TaskStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let counts = store.counts().await.unwrap();
    assert_eq!(counts.total_volunteers, 1);
    assert_eq!(counts.active_volunteers, 1);
    assert_eq!(counts.total_tasks, 4);
    assert_eq!(counts.completed_tasks, 2);
    assert_eq!(counts.pending_tasks, 1);

    let avg = store.average_execution_times().await.unwrap();
    assert_eq!(avg.get("vol_a").copied(), Some(150.0));
}

#[tokio::test]
async fn test_performance_history_by_volunteer() {
    let (_dir, store) = temp_store().await;
    let entries = vec![
        history("vol_a", "t1", t0(), 100.0, true),
        history("vol_a", "t2", t0() + Duration::minutes(30), 120.0, false),
        history("vol_b", "t3", t0() + Duration::minutes(10), 90.0, true),
    ];
    store.insert_performance_history(&entries).await.unwrap();

    let recent = store.recent_performance_history("vol_a", 50).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].task_id, "t2");
    assert!(!recent[0].success);

    let window = Window::new(t0(), t0() + Duration::hours(1));
    let all = store.performance_history(window, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[1].volunteer_id, "vol_b");
    let only_b = store
        .performance_history(window, Some("vol_b"))
        .await
        .unwrap();
    assert_eq!(only_b.len(), 1);
}

#[tokio::test]
async fn test_prune_removes_rows_past_retention() {
    let (_dir, store) = temp_store().await;
    store
        .insert_system_metrics(&[
            metrics(t0() - Duration::days(40), 10.0, 10.0),
            metrics(t0() - Duration::days(1), 20.0, 20.0),
        ])
        .await
        .unwrap();
    store
        .insert_performance_history(&[history(
            "vol_a",
            "t1",
            t0() - Duration::days(31),
            10.0,
            true,
        )])
        .await
        .unwrap();

    let removed = store.prune_old_data(t0()).await.unwrap();
    assert_eq!(removed, 2);
    let left = store.system_metrics_since(t0() - Duration::days(365)).await.unwrap();
    assert_eq!(left.len(), 1);
    store.vacuum().await.unwrap();
}

#[tokio::test]
async fn test_badge_catalog_insert_is_idempotent() {
    let (_dir, store) = temp_store().await;
    let inserted = store.insert_badges(&default_catalog(), t0()).await.unwrap();
    assert_eq!(inserted, 16);
    let again = store.insert_badges(&default_catalog(), t0()).await.unwrap();
    assert_eq!(again, 0);

    let badges = store.active_badges().await.unwrap();
    assert_eq!(badges.len(), 16);
    assert!(badges.iter().all(|b| b.criteria.is_some()));
    let week = badges
        .iter()
        .find(|b| b.badge_id == "volunteer_of_week")
        .unwrap();
    assert_eq!(
        week.criteria,
        Some(BadgeCriteria::Period {
            period: "week".into()
        })
    );
}

#[tokio::test]
async fn test_attributions_list_revoke_and_statistics() {
    let (_dir, store) = temp_store().await;
    store.insert_badges(&default_catalog(), t0()).await.unwrap();
    let badges = store.active_badges().await.unwrap();
    let week = badges.iter().find(|b| b.badge_id == "volunteer_of_week").unwrap();
    let top = badges.iter().find(|b| b.badge_id == "top_performer").unwrap();

    let award = |vid: &str, badge: &Badge, period: &str| Award {
        volunteer_id: vid.into(),
        badge_id: badge.id,
        badge_name: badge.name.clone(),
        period: period.into(),
        period_start: None,
        period_end: None,
        reason: "test".into(),
        metric_value: 1.0,
        rank: None,
    };
    let created = store
        .insert_attributions(
            &[
                award("vol_a", week, "week"),
                award("vol_a", top, "all-time"),
                award("vol_b", top, "all-time"),
            ],
            t0(),
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 3);
    assert_eq!(
        created[0].badge.as_ref().map(|b| b.name.as_str()),
        Some("Volunteer of the Week")
    );

    let page = store
        .list_attributions(&AttributionFilter {
            limit: 2,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.badges.len(), 2);
    assert!(page.has_more);

    let vol_a = store
        .list_attributions(&AttributionFilter {
            volunteer_id: Some("vol_a".into()),
            limit: 50,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(vol_a.total, 2);
    assert!(!vol_a.has_more);

    assert!(store.revoke_attribution(created[2].id, t0()).await.unwrap());
    assert!(!store.revoke_attribution(created[2].id, t0()).await.unwrap());
    assert!(!store.revoke_attribution(9999, t0()).await.unwrap());

    let revoked = store.get_attribution(created[2].id).await.unwrap().unwrap();
    assert!(revoked.revoked);
    assert_eq!(revoked.revoked_date, Some(t0()));

    let active_b = store.volunteer_attributions("vol_b", false).await.unwrap();
    assert!(active_b.is_empty());
    let all_b = store.volunteer_attributions("vol_b", true).await.unwrap();
    assert_eq!(all_b.len(), 1);

    let stats = store.attribution_statistics().await.unwrap();
    assert_eq!(stats.total_attributions, 2);
    assert_eq!(stats.by_period.get("week"), Some(&1));
    assert_eq!(stats.by_period.get("all-time"), Some(&1));
    assert_eq!(stats.top_volunteers[0].volunteer_id, "vol_a");
    assert_eq!(stats.top_volunteers[0].badge_count, 2);

    let recent = store
        .recent_attributions(t0() - Duration::hours(1), 10)
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(store.all_attributions().await.unwrap().len(), 3);
}
