// Badge catalog, period winners, leaderboards and persisted attributions.

use std::collections::BTreeMap;

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AppState, now, since};
use crate::analytics::badges::{self as rules, EarnedBadge, period_winner, tiered_badges};
use crate::analytics::ranking::{RankedVolunteer, RankingMetric, eligible_for_period, rank};
use crate::analytics::Period;
use crate::error::{ApiError, ApiResult, ok};
use crate::models::{Badge, Volunteer, VolunteerBadge};
use crate::store::{AttributionFilter, AttributionPage, AttributionStatistics};

const LEADERBOARD_SIZE: usize = 50;

pub(super) async fn catalog(State(state): State<AppState>) -> ApiResult<Vec<Badge>> {
    ok(state.store.active_badges().await?)
}

#[derive(Debug, Serialize)]
pub(super) struct PeriodWinner {
    badge: &'static str,
    period: &'static str,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    volunteer: Volunteer,
    metric: &'static str,
    value: f64,
    reason: String,
}

async fn winner(state: &AppState, period: Period) -> ApiResult<PeriodWinner> {
    let volunteers = state.store.list_volunteers().await?;
    let now = now();
    let (volunteer, value) = period_winner(&volunteers, period, now)
        .ok_or_else(|| ApiError::NoData(format!("no eligible volunteer this {}", period.as_str())))?;
    let (badge, metric, reason) = match period {
        Period::Week => (
            "Volunteer of the Week",
            "tasks_completed",
            format!("{} tasks completed", volunteer.tasks_completed),
        ),
        Period::Month => (
            "Volunteer of the Month",
            "performance_score",
            format!("Performance score {:.1}%", volunteer.performance_score),
        ),
        _ => (
            "Volunteer of the Year",
            "total_computation_time",
            format!("{:.1} hours of computation", volunteer.total_computation_time),
        ),
    };
    let lookback = period.lookback().unwrap_or_else(Duration::zero);
    ok(PeriodWinner {
        badge,
        period: period.as_str(),
        period_start: now - lookback,
        period_end: now,
        volunteer: volunteer.clone(),
        metric,
        value,
        reason,
    })
}

pub(super) async fn volunteer_of_week(State(state): State<AppState>) -> ApiResult<PeriodWinner> {
    winner(&state, Period::Week).await
}

pub(super) async fn volunteer_of_month(State(state): State<AppState>) -> ApiResult<PeriodWinner> {
    winner(&state, Period::Month).await
}

pub(super) async fn volunteer_of_year(State(state): State<AppState>) -> ApiResult<PeriodWinner> {
    winner(&state, Period::Year).await
}

#[derive(Debug, Deserialize)]
pub(super) struct TopPerformersQuery {
    category: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct PerformerList {
    title: &'static str,
    description: &'static str,
    volunteers: Vec<Volunteer>,
}

/// `connected` and `fast` consider online volunteers only; `tasks` considers everyone.
pub(super) async fn top_performers(
    State(state): State<AppState>,
    query: Result<Query<TopPerformersQuery>, QueryRejection>,
) -> ApiResult<BTreeMap<&'static str, PerformerList>> {
    let Query(q) = query?;
    let category = q.category.as_deref().unwrap_or("all");
    if !matches!(category, "all" | "connected" | "fast" | "tasks") {
        return Err(ApiError::BadRequest(format!(
            "unknown category: {} (expected all, connected, fast or tasks)",
            category
        )));
    }
    let limit = q.limit.unwrap_or(10);
    let volunteers = state.store.list_volunteers().await?;
    let online: Vec<Volunteer> = volunteers
        .iter()
        .filter(|v| v.status.is_online())
        .cloned()
        .collect();
    let top = |pool: &[Volunteer], metric| -> Vec<Volunteer> {
        rank(pool, metric, limit)
            .into_iter()
            .map(|r| r.volunteer)
            .collect()
    };

    let mut out = BTreeMap::new();
    if matches!(category, "all" | "connected") {
        out.insert(
            "most_connected",
            PerformerList {
                title: "Most Connected",
                description: "Total computation time",
                volunteers: top(&online, RankingMetric::TotalComputationTime),
            },
        );
    }
    if matches!(category, "all" | "fast") {
        out.insert(
            "fastest",
            PerformerList {
                title: "Fastest",
                description: "Performance score",
                volunteers: top(&online, RankingMetric::PerformanceScore),
            },
        );
    }
    if matches!(category, "all" | "tasks") {
        out.insert(
            "most_tasks",
            PerformerList {
                title: "Most Tasks",
                description: "Tasks completed",
                volunteers: top(&volunteers, RankingMetric::TasksCompleted),
            },
        );
    }
    ok(out)
}

#[derive(Debug, Serialize)]
pub(super) struct VolunteerBadges {
    volunteer: Volunteer,
    badges: Vec<EarnedBadge>,
    total_badges: usize,
}

pub(super) async fn volunteer_badges(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<VolunteerBadges> {
    let Path(volunteer_id) = path?;
    let volunteer = find_volunteer(&state, &volunteer_id).await?;
    let badges = tiered_badges(&volunteer, now());
    ok(VolunteerBadges {
        total_badges: badges.len(),
        volunteer,
        badges,
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct LeaderboardQuery {
    period: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct Leaderboard {
    period: String,
    leaderboard: Vec<RankedVolunteer>,
    total_volunteers: usize,
    generated_at: DateTime<Utc>,
}

pub(super) async fn leaderboard(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> ApiResult<Leaderboard> {
    let Query(q) = query?;
    let period = q.period.unwrap_or_else(|| "all".into());
    let now = now();
    let eligible = eligible_for_period(&state.store.list_volunteers().await?, &period, now);
    ok(Leaderboard {
        leaderboard: rank(&eligible, RankingMetric::Composite, LEADERBOARD_SIZE),
        total_volunteers: eligible.len(),
        period,
        generated_at: now,
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct AttributedQuery {
    period: Option<String>,
    volunteer_id: Option<String>,
    badge_id: Option<i64>,
    limit: Option<u32>,
    offset: Option<u32>,
}

pub(super) async fn attributed(
    State(state): State<AppState>,
    query: Result<Query<AttributedQuery>, QueryRejection>,
) -> ApiResult<AttributionPage> {
    let Query(q) = query?;
    let filter = AttributionFilter {
        period: q.period,
        volunteer_id: q.volunteer_id,
        badge_id: q.badge_id,
        limit: q.limit.unwrap_or(50),
        offset: q.offset.unwrap_or(0),
    };
    ok(state.store.list_attributions(&filter).await?)
}

#[derive(Debug, Deserialize)]
pub(super) struct RecentQuery {
    hours: Option<u32>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(super) struct RecentAttributions {
    badges: Vec<VolunteerBadge>,
    count: usize,
    hours: u32,
    since: DateTime<Utc>,
}

pub(super) async fn recent(
    State(state): State<AppState>,
    query: Result<Query<RecentQuery>, QueryRejection>,
) -> ApiResult<RecentAttributions> {
    let Query(q) = query?;
    let hours = q.hours.unwrap_or(24);
    let since = since(Duration::try_hours(hours as i64), "hours")?;
    let badges = state
        .store
        .recent_attributions(since, q.limit.unwrap_or(20))
        .await?;
    ok(RecentAttributions {
        count: badges.len(),
        badges,
        hours,
        since,
    })
}

pub(super) async fn statistics(State(state): State<AppState>) -> ApiResult<AttributionStatistics> {
    ok(state.store.attribution_statistics().await?)
}

#[derive(Debug, Serialize)]
pub(super) struct AttributionDetails {
    #[serde(flatten)]
    attribution: VolunteerBadge,
    #[serde(skip_serializing_if = "Option::is_none")]
    volunteer: Option<Volunteer>,
}

pub(super) async fn attribution(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<AttributionDetails> {
    let Path(id) = path?;
    let attribution = state
        .store
        .get_attribution(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("attribution {} not found", id)))?;
    let volunteer = state.store.get_volunteer(&attribution.volunteer_id).await?;
    ok(AttributionDetails {
        attribution,
        volunteer,
    })
}

pub(super) async fn revoke(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<VolunteerBadge> {
    let Path(id) = path?;
    if !state.store.revoke_attribution(id, now()).await? {
        return Err(ApiError::NotFound(format!(
            "attribution {} not found or already revoked",
            id
        )));
    }
    let attribution = state
        .store
        .get_attribution(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("attribution {} not found", id)))?;
    tracing::info!(attribution_id = id, volunteer_id = %attribution.volunteer_id, "badge revoked");
    ok(attribution)
}

#[derive(Debug, Deserialize)]
pub(super) struct VolunteerAttributedQuery {
    include_revoked: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(super) struct AttributedSummary {
    total_badges: usize,
    active_badges: usize,
    revoked_badges: usize,
    by_period: BTreeMap<String, usize>,
    by_category: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub(super) struct VolunteerAttributed {
    volunteer: Volunteer,
    badges: Vec<VolunteerBadge>,
    statistics: AttributedSummary,
}

pub(super) async fn volunteer_attributed(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<VolunteerAttributedQuery>, QueryRejection>,
) -> ApiResult<VolunteerAttributed> {
    let Path(volunteer_id) = path?;
    let Query(q) = query?;
    let volunteer = find_volunteer(&state, &volunteer_id).await?;
    let badges = state
        .store
        .volunteer_attributions(&volunteer_id, q.include_revoked.unwrap_or(false))
        .await?;

    let mut by_period: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    for b in badges.iter().filter(|b| !b.revoked) {
        let period = b.period.clone().unwrap_or_else(|| "all-time".into());
        *by_period.entry(period).or_default() += 1;
        if let Some(badge) = &b.badge {
            let category = badge.category.clone().unwrap_or_else(|| "other".into());
            *by_category.entry(category).or_default() += 1;
        }
    }
    let revoked = badges.iter().filter(|b| b.revoked).count();

    ok(VolunteerAttributed {
        statistics: AttributedSummary {
            total_badges: badges.len(),
            active_badges: badges.len() - revoked,
            revoked_badges: revoked,
            by_period,
            by_category,
        },
        volunteer,
        badges,
    })
}

#[derive(Debug, Serialize)]
pub(super) struct Evaluation {
    evaluated_volunteers: usize,
    awarded: usize,
    attributions: Vec<VolunteerBadge>,
}

/// Run the catalog rules against current volunteer statistics and persist new awards.
pub(super) async fn evaluate(State(state): State<AppState>) -> ApiResult<Evaluation> {
    let now = now();
    let badges = state.store.active_badges().await?;
    let volunteers = state.store.list_volunteers().await?;
    let avg_execution = state.store.average_execution_times().await?;
    let existing = state.store.all_attributions().await?;

    let awards = rules::evaluate(&badges, &volunteers, &avg_execution, &existing, now);
    let attributions = state.store.insert_attributions(&awards, now).await?;
    tracing::info!(
        volunteers = volunteers.len(),
        awarded = attributions.len(),
        "badge evaluation complete"
    );
    ok(Evaluation {
        evaluated_volunteers: volunteers.len(),
        awarded: attributions.len(),
        attributions,
    })
}

async fn find_volunteer(state: &AppState, volunteer_id: &str) -> Result<Volunteer, ApiError> {
    state
        .store
        .get_volunteer(volunteer_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("volunteer {} not found", volunteer_id)))
}

