// Performance analytics over a resolved time window.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::{AppState, Windowed, now};
use crate::analytics::compare::compare_field;
use crate::analytics::ranking::{RankedVolunteer, RankingMetric, rank};
use crate::analytics::report::{
    self, HistoryPerformance, PerformanceReport, SystemPerformance, TaskPerformance,
};
use crate::analytics::{MetricField, MetricsSource, Window, peaks, window};
use crate::error::{ApiError, ApiResult, ok};
use crate::models::{PeakReport, PeriodComparison};

/// Fields compared between the current and the preceding window.
const COMPARED_FIELDS: [MetricField; 4] = [
    MetricField::CpuUsage,
    MetricField::MemoryUsage,
    MetricField::NetworkThroughput,
    MetricField::CompletedTasks,
];

#[derive(Debug, Default, Deserialize)]
pub(super) struct PerformanceQuery {
    period: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    threshold: Option<f64>,
    limit: Option<usize>,
    include_trends: Option<bool>,
    metric: Option<String>,
}

impl PerformanceQuery {
    fn window(&self) -> Result<Window, ApiError> {
        Ok(window::resolve(
            self.period.as_deref().unwrap_or("day"),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            now(),
        )?)
    }
}

/// An empty window is no-data, not a zero-filled payload.
fn non_empty<T>(rows: Vec<T>, what: &str, window: Window) -> Result<Vec<T>, ApiError> {
    if rows.is_empty() {
        return Err(ApiError::NoData(format!(
            "no {} between {} and {}",
            what,
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        )));
    }
    Ok(rows)
}

pub(super) async fn system(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<Windowed<SystemPerformance>> {
    let Query(q) = query?;
    let window = q.window()?;
    let samples = non_empty(state.store.system_metrics(window).await?, "system metrics", window)?;
    ok(Windowed {
        period: window,
        data: report::system_performance(&samples, q.include_trends.unwrap_or(true)),
    })
}

pub(super) async fn tasks(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<Windowed<TaskPerformance>> {
    let Query(q) = query?;
    let window = q.window()?;
    let tasks = non_empty(state.store.tasks(window, None).await?, "tasks", window)?;
    ok(Windowed {
        period: window,
        data: report::task_performance(&tasks),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct VolunteerPerformance {
    volunteer_id: String,
    #[serde(flatten)]
    performance: HistoryPerformance,
}

pub(super) async fn volunteer(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<Windowed<VolunteerPerformance>> {
    let Path(volunteer_id) = path?;
    let Query(q) = query?;
    let window = q.window()?;
    if state.store.get_volunteer(&volunteer_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "volunteer {} not found",
            volunteer_id
        )));
    }
    let history = state
        .store
        .performance_history(window, Some(&volunteer_id))
        .await?;
    let history = non_empty(history, "performance history", window)?;
    ok(Windowed {
        period: window,
        data: VolunteerPerformance {
            volunteer_id,
            performance: report::history_performance(&history, q.include_trends.unwrap_or(true)),
        },
    })
}

pub(super) async fn peaks(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<Windowed<PeakReport>> {
    let Query(q) = query?;
    let window = q.window()?;
    let field: MetricField = q.metric.as_deref().unwrap_or("cpu_usage").parse()?;
    let threshold = q.threshold.unwrap_or(state.config.analytics.peak_threshold);
    let limit = q.limit.unwrap_or(state.config.analytics.peak_limit);
    let samples = non_empty(state.store.system_metrics(window).await?, "system metrics", window)?;
    ok(Windowed {
        period: window,
        data: peaks::detect(&samples, field, threshold, limit),
    })
}

#[derive(Debug, Serialize)]
pub(super) struct Comparison {
    current: Window,
    previous: Window,
    comparisons: Vec<PeriodComparison>,
}

/// Current window against the preceding window of equal length.
pub(super) async fn compare(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<Comparison> {
    let Query(q) = query?;
    let current = q.window()?;
    let previous = current.preceding();
    let before = state.store.system_metrics(previous).await?;
    let after = state.store.system_metrics(current).await?;
    let comparisons = COMPARED_FIELDS
        .iter()
        .map(|f| compare_field(&before, &after, *f))
        .collect::<Result<Vec<_>, _>>()?;
    ok(Comparison {
        current,
        previous,
        comparisons,
    })
}

#[derive(Debug, Serialize)]
pub(super) struct Ranking {
    metric: String,
    ranking: Vec<RankedVolunteer>,
}

pub(super) async fn ranking(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<Ranking> {
    let Query(q) = query?;
    let metric: RankingMetric = q.metric.as_deref().unwrap_or("composite").parse()?;
    let limit = q.limit.unwrap_or(state.config.analytics.ranking_limit);
    let volunteers = state.store.volunteers().await?;
    ok(Ranking {
        metric: metric.to_string(),
        ranking: rank(&volunteers, metric, limit),
    })
}

pub(super) async fn report(
    State(state): State<AppState>,
    query: Result<Query<PerformanceQuery>, QueryRejection>,
) -> ApiResult<PerformanceReport> {
    let Query(q) = query?;
    let window = q.window()?;
    let report = report::build(
        state.store.as_ref(),
        window,
        state.config.analytics.report_top_volunteers,
        now(),
    )
    .await?;
    ok(report)
}
