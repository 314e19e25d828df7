// Volunteer leaderboards: single-field rankings and the weighted composite score.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::AnalyticsError;
use super::aggregate::round2;
use crate::models::Volunteer;

const COMPOSITE_TASKS_WEIGHT: f64 = 0.4;
const COMPOSITE_SCORE_WEIGHT: f64 = 0.3;
const COMPOSITE_HOURS_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingMetric {
    Composite,
    TasksCompleted,
    PerformanceScore,
    TotalComputationTime,
}

impl RankingMetric {
    pub fn name(&self) -> &'static str {
        match self {
            RankingMetric::Composite => "composite",
            RankingMetric::TasksCompleted => "tasks_completed",
            RankingMetric::PerformanceScore => "performance_score",
            RankingMetric::TotalComputationTime => "total_computation_time",
        }
    }

    pub fn score(&self, v: &Volunteer) -> f64 {
        match self {
            RankingMetric::Composite => composite_score(v),
            RankingMetric::TasksCompleted => v.tasks_completed as f64,
            RankingMetric::PerformanceScore => v.performance_score,
            RankingMetric::TotalComputationTime => v.total_computation_time,
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankingMetric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "composite" => Ok(RankingMetric::Composite),
            "tasks_completed" => Ok(RankingMetric::TasksCompleted),
            "performance_score" => Ok(RankingMetric::PerformanceScore),
            "total_computation_time" => Ok(RankingMetric::TotalComputationTime),
            other => Err(AnalyticsError::UnknownMetric(other.to_string())),
        }
    }
}

/// tasks * 0.4 + performance score * 0.3 + computation hours * 0.3, unrounded.
pub fn composite_score(v: &Volunteer) -> f64 {
    v.tasks_completed as f64 * COMPOSITE_TASKS_WEIGHT
        + v.performance_score * COMPOSITE_SCORE_WEIGHT
        + v.total_computation_time * COMPOSITE_HOURS_WEIGHT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedVolunteer {
    /// 1-based position.
    pub rank: usize,
    pub score: f64,
    pub volunteer: Volunteer,
}

/// Highest score first, ties keep input order; at most `limit` entries.
pub fn rank(volunteers: &[Volunteer], metric: RankingMetric, limit: usize) -> Vec<RankedVolunteer> {
    let mut scored: Vec<(f64, &Volunteer)> =
        volunteers.iter().map(|v| (metric.score(v), v)).collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (score, v))| RankedVolunteer {
            rank: i + 1,
            score: round2(score),
            volunteer: v.clone(),
        })
        .collect()
}

/// Volunteers eligible for a leaderboard period: `week`/`month` by last_seen, `year` by
/// joined_date; anything else keeps everyone.
pub fn eligible_for_period(
    volunteers: &[Volunteer],
    period: &str,
    now: DateTime<Utc>,
) -> Vec<Volunteer> {
    let keep = |v: &&Volunteer| match period {
        "week" => v.last_seen >= now - Duration::days(7),
        "month" => v.last_seen >= now - Duration::days(30),
        "year" => v.joined_date >= now - Duration::days(365),
        _ => true,
    };
    volunteers.iter().filter(keep).cloned().collect()
}
