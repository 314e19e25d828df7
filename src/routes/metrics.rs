// Raw metrics: latest snapshot, volunteers, tasks, cost and volunteer analytics.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::{AppState, since};
use crate::analytics::aggregate::round2;
use crate::analytics::ranking::{RankingMetric, rank};
use crate::analytics::report::{COST_PER_TASK_TRADITIONAL, COST_PER_TASK_VOLUNTEER};
use crate::error::{ApiError, ApiResult, ok};
use crate::models::{PerformanceHistory, SystemMetrics, Task, TaskStatus, Volunteer, VolunteerStatus};

const VOLUNTEER_HISTORY_LIMIT: u32 = 50;
const TOP_VOLUNTEERS: usize = 10;

pub(super) async fn system_metrics(State(state): State<AppState>) -> ApiResult<SystemMetrics> {
    match state.store.latest_system_metrics().await? {
        Some(m) => ok(m),
        None => Err(ApiError::NoData("no system metrics recorded".into())),
    }
}

pub(super) async fn volunteers(State(state): State<AppState>) -> ApiResult<Vec<Volunteer>> {
    ok(state.store.list_volunteers().await?)
}

#[derive(Debug, Serialize)]
pub(super) struct VolunteerDetails {
    volunteer: Volunteer,
    performance_history: Vec<PerformanceHistory>,
}

pub(super) async fn volunteer_details(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<VolunteerDetails> {
    let Path(volunteer_id) = path?;
    let volunteer = state
        .store
        .get_volunteer(&volunteer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("volunteer {} not found", volunteer_id)))?;
    let performance_history = state
        .store
        .recent_performance_history(&volunteer_id, VOLUNTEER_HISTORY_LIMIT)
        .await?;
    ok(VolunteerDetails {
        volunteer,
        performance_history,
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct TasksQuery {
    status: Option<String>,
    limit: Option<u32>,
}

pub(super) async fn tasks(
    State(state): State<AppState>,
    query: Result<Query<TasksQuery>, QueryRejection>,
) -> ApiResult<Vec<Task>> {
    let Query(q) = query?;
    let status = q
        .status
        .as_deref()
        .map(str::parse::<TaskStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    ok(state.store.list_tasks(status, q.limit.unwrap_or(100)).await?)
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    days: Option<u32>,
}

/// System snapshots for the last `days` days (default 7), oldest first.
pub(super) async fn performance_history(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Vec<SystemMetrics>> {
    let Query(q) = query?;
    let since = since(Duration::try_days(q.days.unwrap_or(7) as i64), "days")?;
    ok(state.store.system_metrics_since(since).await?)
}

#[derive(Debug, Serialize)]
pub(super) struct CostSavings {
    completed_tasks: i64,
    traditional_cost: f64,
    volunteer_cost: f64,
    total_savings: f64,
    savings_percentage: f64,
    cost_per_task_saved: f64,
}

pub(super) async fn cost_savings(State(state): State<AppState>) -> ApiResult<CostSavings> {
    let completed_tasks = state.store.counts().await?.completed_tasks;
    let traditional_cost = completed_tasks as f64 * COST_PER_TASK_TRADITIONAL;
    let volunteer_cost = completed_tasks as f64 * COST_PER_TASK_VOLUNTEER;
    let total_savings = traditional_cost - volunteer_cost;
    let savings_percentage = if traditional_cost > 0.0 {
        total_savings / traditional_cost * 100.0
    } else {
        0.0
    };
    ok(CostSavings {
        completed_tasks,
        traditional_cost: round2(traditional_cost),
        volunteer_cost: round2(volunteer_cost),
        total_savings: round2(total_savings),
        savings_percentage: round2(savings_percentage),
        cost_per_task_saved: round2(COST_PER_TASK_TRADITIONAL - COST_PER_TASK_VOLUNTEER),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct VolunteerStatistics {
    total_volunteers: usize,
    active_volunteers: usize,
    average_performance_score: f64,
    total_computation_hours: f64,
    activity_rate: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct VolunteerAnalytics {
    top_volunteers: Vec<Volunteer>,
    statistics: VolunteerStatistics,
}

pub(super) async fn volunteer_performance(
    State(state): State<AppState>,
) -> ApiResult<VolunteerAnalytics> {
    let volunteers = state.store.list_volunteers().await?;
    let total = volunteers.len();
    let active = volunteers
        .iter()
        .filter(|v| v.status == VolunteerStatus::Active)
        .count();
    let (score_sum, hours) = volunteers.iter().fold((0.0, 0.0), |(s, h), v| {
        (s + v.performance_score, h + v.total_computation_time)
    });
    let ratio = |part: f64| if total > 0 { part / total as f64 } else { 0.0 };

    ok(VolunteerAnalytics {
        top_volunteers: rank(&volunteers, RankingMetric::TasksCompleted, TOP_VOLUNTEERS)
            .into_iter()
            .map(|r| r.volunteer)
            .collect(),
        statistics: VolunteerStatistics {
            total_volunteers: total,
            active_volunteers: active,
            average_performance_score: round2(ratio(score_sum)),
            total_computation_hours: round2(hours),
            activity_rate: round2(ratio(active as f64) * 100.0),
        },
    })
}
