// Badge rules: tiered display badges, period winners, and catalog criteria evaluation.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ranking::{RankingMetric, composite_score, rank};
use super::window::Period;
use crate::models::{Badge, BadgeCriteria, BadgeLevel, Volunteer, VolunteerBadge};

/// Badge computed on the fly from a volunteer's current statistics (not persisted).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarnedBadge {
    pub name: String,
    pub icon: String,
    pub description: String,
    pub level: BadgeLevel,
}

fn tier(value: f64, silver_from: f64, gold_from: f64) -> BadgeLevel {
    if value < silver_from {
        BadgeLevel::Bronze
    } else if value < gold_from {
        BadgeLevel::Silver
    } else {
        BadgeLevel::Gold
    }
}

/// Participation, performance, loyalty and veteran badges for one volunteer.
pub fn tiered_badges(v: &Volunteer, now: DateTime<Utc>) -> Vec<EarnedBadge> {
    let mut out = Vec::new();
    if v.tasks_completed > 0 {
        out.push(EarnedBadge {
            name: "Active Participant".into(),
            icon: "🎯".into(),
            description: format!("{} tasks completed", v.tasks_completed),
            level: tier(v.tasks_completed as f64, 50.0, 200.0),
        });
    }
    if v.performance_score >= 80.0 {
        out.push(EarnedBadge {
            name: "Performance Excellence".into(),
            icon: "⚡".into(),
            description: format!("Performance score: {:.1}%", v.performance_score),
            level: if v.performance_score >= 95.0 {
                BadgeLevel::Gold
            } else {
                BadgeLevel::Silver
            },
        });
    }
    if v.total_computation_time >= 10.0 {
        out.push(EarnedBadge {
            name: "Loyal Contributor".into(),
            icon: "⭐".into(),
            description: format!("{:.1} hours contributed", v.total_computation_time),
            level: tier(v.total_computation_time, 50.0, 200.0),
        });
    }
    let days = v.days_active(now);
    if days >= 30 {
        out.push(EarnedBadge {
            name: "Veteran".into(),
            icon: "🏆".into(),
            description: format!("{} days of seniority", days),
            level: tier(days as f64, 90.0, 365.0),
        });
    }
    out
}

/// Winner of a rolling period and the value it won on: `week` by tasks completed
/// (seen in the last 7 days), `month` by performance score (seen in the last 30 days),
/// `year` by computation hours (joined in the last 365 days).
pub fn period_winner<'a>(
    volunteers: &'a [Volunteer],
    period: Period,
    now: DateTime<Utc>,
) -> Option<(&'a Volunteer, f64)> {
    let metric = match period {
        Period::Week => RankingMetric::TasksCompleted,
        Period::Month => RankingMetric::PerformanceScore,
        Period::Year => RankingMetric::TotalComputationTime,
        _ => return None,
    };
    let since = now - period.lookback()?;
    let eligible = |v: &Volunteer| {
        if period == Period::Year {
            v.joined_date >= since
        } else {
            v.last_seen >= since
        }
    };
    volunteers
        .iter()
        .filter(|v| eligible(v))
        .map(|v| (v, metric.score(v)))
        // first maximum wins on ties
        .fold(None, |best: Option<(&Volunteer, f64)>, (v, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((v, s)),
        })
}

/// An attribution the rule table decided to grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Award {
    pub volunteer_id: String,
    /// Catalog row id.
    pub badge_id: i64,
    pub badge_name: String,
    pub period: String,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub reason: String,
    pub metric_value: f64,
    pub rank: Option<i64>,
}

/// Volunteers whose average execution time falls in the fastest `100 - percentile` percent.
fn fastest_volunteers(avg_execution: &HashMap<String, f64>, percentile: f64) -> HashSet<String> {
    let mut sorted: Vec<f64> = avg_execution.values().copied().collect();
    if sorted.is_empty() {
        return HashSet::new();
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let share = ((100.0 - percentile) / 100.0).clamp(0.0, 1.0);
    let keep = ((sorted.len() as f64 * share).ceil() as usize).max(1);
    let cutoff = sorted[keep - 1];
    avg_execution
        .iter()
        .filter(|(_, avg)| **avg <= cutoff)
        .map(|(id, _)| id.clone())
        .collect()
}

fn in_range(value: f64, min: f64, max: Option<f64>) -> bool {
    value >= min && max.is_none_or(|m| value <= m)
}

/// Match every active catalog badge against the volunteers and return the awards not
/// already held. Range and ranking badges are held once per volunteer; period badges once
/// per period window.
pub fn evaluate(
    badges: &[Badge],
    volunteers: &[Volunteer],
    avg_execution: &HashMap<String, f64>,
    existing: &[VolunteerBadge],
    now: DateTime<Utc>,
) -> Vec<Award> {
    let held: HashSet<(&str, i64)> = existing
        .iter()
        .filter(|a| !a.revoked)
        .map(|a| (a.volunteer_id.as_str(), a.badge_id))
        .collect();
    let ranks: HashMap<String, usize> = rank(volunteers, RankingMetric::Composite, volunteers.len())
        .into_iter()
        .map(|r| (r.volunteer.volunteer_id, r.rank))
        .collect();

    let mut out = Vec::new();
    for badge in badges.iter().filter(|b| b.active) {
        let Some(criteria) = &badge.criteria else {
            continue;
        };
        let award = |v: &Volunteer, value: f64, reason: String, rank: Option<i64>| Award {
            volunteer_id: v.volunteer_id.clone(),
            badge_id: badge.id,
            badge_name: badge.name.clone(),
            period: "all-time".into(),
            period_start: None,
            period_end: None,
            reason,
            metric_value: value,
            rank,
        };

        match criteria {
            BadgeCriteria::Period { period } => {
                let period = Period::from_tag(period);
                let Some(lookback) = period.lookback() else {
                    continue;
                };
                let start = now - lookback;
                let already_awarded = existing.iter().any(|a| {
                    !a.revoked && a.badge_id == badge.id && a.period_end.is_some_and(|e| e > start)
                });
                if already_awarded {
                    continue;
                }
                if let Some((v, value)) = period_winner(volunteers, period, now) {
                    out.push(Award {
                        period: period.as_str().into(),
                        period_start: Some(start),
                        period_end: Some(now),
                        rank: Some(1),
                        ..award(v, value, format!("Top volunteer of the {}", period.as_str()), None)
                    });
                }
            }
            BadgeCriteria::Ranking { max_rank } => {
                for v in volunteers {
                    let Some(&r) = ranks.get(&v.volunteer_id) else {
                        continue;
                    };
                    if r <= *max_rank as usize && !held.contains(&(v.volunteer_id.as_str(), badge.id)) {
                        out.push(award(
                            v,
                            composite_score(v),
                            format!("Ranked #{} on the composite leaderboard", r),
                            Some(r as i64),
                        ));
                    }
                }
            }
            BadgeCriteria::AvgExecutionTime { percentile } => {
                let fastest = fastest_volunteers(avg_execution, *percentile);
                for v in volunteers {
                    if !fastest.contains(&v.volunteer_id)
                        || held.contains(&(v.volunteer_id.as_str(), badge.id))
                    {
                        continue;
                    }
                    let avg = avg_execution.get(&v.volunteer_id).copied().unwrap_or(0.0);
                    out.push(award(
                        v,
                        avg,
                        format!("Average execution time {:.1}s", avg),
                        None,
                    ));
                }
            }
            BadgeCriteria::TasksCompleted { min, max }
            | BadgeCriteria::PerformanceScore { min, max }
            | BadgeCriteria::ComputationTime { min, max }
            | BadgeCriteria::DaysActive { min, max } => {
                for v in volunteers {
                    if held.contains(&(v.volunteer_id.as_str(), badge.id)) {
                        continue;
                    }
                    let (value, reason) = match criteria {
                        BadgeCriteria::TasksCompleted { .. } => (
                            v.tasks_completed as f64,
                            format!("{} tasks completed", v.tasks_completed),
                        ),
                        BadgeCriteria::PerformanceScore { .. } => (
                            v.performance_score,
                            format!("Performance score {:.1}%", v.performance_score),
                        ),
                        BadgeCriteria::ComputationTime { .. } => (
                            v.total_computation_time,
                            format!("{:.1} hours of computation", v.total_computation_time),
                        ),
                        _ => {
                            let days = v.days_active(now);
                            (days as f64, format!("{} days of seniority", days))
                        }
                    };
                    if in_range(value, *min, *max) {
                        out.push(award(v, value, reason, None));
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VolunteerStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
    }

    fn volunteer(id: &str, tasks: i64, score: f64, hours: f64, days: i64) -> Volunteer {
        Volunteer {
            id: 0,
            volunteer_id: id.into(),
            name: id.into(),
            status: VolunteerStatus::Active,
            joined_date: now() - Duration::days(days),
            last_seen: now() - Duration::hours(3),
            tasks_completed: tasks,
            total_computation_time: hours,
            cpu_cores: 8,
            memory_gb: 16.0,
            performance_score: score,
        }
    }

    fn badge(id: i64, criteria: BadgeCriteria) -> Badge {
        Badge {
            id,
            badge_id: format!("badge_{}", id),
            name: format!("Badge {}", id),
            description: None,
            category: None,
            icon: "🏅".into(),
            level: BadgeLevel::Gold,
            criteria: Some(criteria),
            active: true,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn tiered_badges_follow_thresholds() {
        let v = volunteer("a", 120, 96.0, 5.0, 400);
        let got = tiered_badges(&v, now());
        let summary: Vec<(&str, BadgeLevel)> =
            got.iter().map(|b| (b.name.as_str(), b.level)).collect();
        assert_eq!(
            summary,
            vec![
                ("Active Participant", BadgeLevel::Silver),
                ("Performance Excellence", BadgeLevel::Gold),
                ("Veteran", BadgeLevel::Gold),
            ]
        );

        let newcomer = volunteer("b", 0, 50.0, 0.0, 3);
        assert!(tiered_badges(&newcomer, now()).is_empty());
    }

    #[test]
    fn period_winners() {
        let mut away = volunteer("away", 500, 99.0, 900.0, 800);
        away.last_seen = now() - Duration::days(40);
        let vols = vec![
            away,
            volunteer("busy", 300, 70.0, 10.0, 100),
            volunteer("sharp", 20, 97.0, 300.0, 50),
        ];
        let (w, v) = period_winner(&vols, Period::Week, now()).unwrap();
        assert_eq!((w.volunteer_id.as_str(), v), ("busy", 300.0));
        let (m, _) = period_winner(&vols, Period::Month, now()).unwrap();
        assert_eq!(m.volunteer_id, "sharp");
        let (y, _) = period_winner(&vols, Period::Year, now()).unwrap();
        assert_eq!(y.volunteer_id, "sharp");
        assert!(period_winner(&vols, Period::Custom, now()).is_none());
        assert!(period_winner(&[], Period::Week, now()).is_none());
    }

    #[test]
    fn range_criteria_award_once() {
        let vols = vec![volunteer("a", 250, 60.0, 0.0, 10), volunteer("b", 40, 60.0, 0.0, 10)];
        let catalog = vec![badge(
            7,
            BadgeCriteria::TasksCompleted {
                min: 200.0,
                max: Some(499.0),
            },
        )];
        let awards = evaluate(&catalog, &vols, &HashMap::new(), &[], now());
        assert_eq!(awards.len(), 1);
        assert_eq!(awards[0].volunteer_id, "a");
        assert_eq!(awards[0].metric_value, 250.0);
        assert_eq!(awards[0].period, "all-time");

        let held = VolunteerBadge {
            id: 1,
            volunteer_id: "a".into(),
            badge_id: 7,
            earned_date: now(),
            period: Some("all-time".into()),
            period_start: None,
            period_end: None,
            reason: None,
            metric_value: Some(250.0),
            rank: None,
            notified: false,
            notification_date: None,
            revoked: false,
            revoked_date: None,
            created_at: now(),
            badge: None,
        };
        assert!(evaluate(&catalog, &vols, &HashMap::new(), &[held], now()).is_empty());
    }

    #[test]
    fn ranking_and_speed_criteria() {
        let vols = vec![
            volunteer("a", 10, 50.0, 1.0, 10),
            volunteer("b", 500, 90.0, 100.0, 10),
            volunteer("c", 100, 80.0, 10.0, 10),
        ];
        let catalog = vec![
            badge(1, BadgeCriteria::Ranking { max_rank: 2 }),
            badge(2, BadgeCriteria::AvgExecutionTime { percentile: 90.0 }),
        ];
        let avg: HashMap<String, f64> = [("a", 30.0), ("b", 120.0), ("c", 60.0)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let awards = evaluate(&catalog, &vols, &avg, &[], now());
        let ranked: Vec<(&str, Option<i64>)> = awards
            .iter()
            .filter(|a| a.badge_id == 1)
            .map(|a| (a.volunteer_id.as_str(), a.rank))
            .collect();
        assert_eq!(ranked, vec![("b", Some(1)), ("c", Some(2))]);
        let fast: Vec<&str> = awards
            .iter()
            .filter(|a| a.badge_id == 2)
            .map(|a| a.volunteer_id.as_str())
            .collect();
        assert_eq!(fast, vec!["a"]);
    }

    #[test]
    fn period_badge_once_per_window() {
        let vols = vec![volunteer("a", 10, 50.0, 1.0, 10)];
        let catalog = vec![badge(3, BadgeCriteria::Period { period: "week".into() })];
        let awards = evaluate(&catalog, &vols, &HashMap::new(), &[], now());
        assert_eq!(awards.len(), 1);
        assert_eq!(awards[0].period, "week");
        assert_eq!(awards[0].period_start, Some(now() - Duration::days(7)));

        let prior = VolunteerBadge {
            id: 1,
            volunteer_id: "a".into(),
            badge_id: 3,
            earned_date: now() - Duration::days(2),
            period: Some("week".into()),
            period_start: Some(now() - Duration::days(9)),
            period_end: Some(now() - Duration::days(2)),
            reason: None,
            metric_value: None,
            rank: Some(1),
            notified: false,
            notification_date: None,
            revoked: false,
            revoked_date: None,
            created_at: now(),
            badge: None,
        };
        assert!(evaluate(&catalog, &vols, &HashMap::new(), &[prior], now()).is_empty());
    }
}
