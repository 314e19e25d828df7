// Badge catalog entries, their award rules, and attributions to volunteers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeLevel {
    #[default]
    Bronze,
    Silver,
    Gold,
}

impl BadgeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeLevel::Bronze => "bronze",
            BadgeLevel::Silver => "silver",
            BadgeLevel::Gold => "gold",
        }
    }
}

impl fmt::Display for BadgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BadgeLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bronze" => Ok(BadgeLevel::Bronze),
            "silver" => Ok(BadgeLevel::Silver),
            "gold" => Ok(BadgeLevel::Gold),
            other => anyhow::bail!("unknown badge level: {}", other),
        }
    }
}

/// Award rule stored as JSON in `badges.criteria`, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCriteria {
    /// Single winner of a rolling window: `week`, `month` or `year`.
    Period { period: String },
    TasksCompleted {
        min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    PerformanceScore {
        min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Hours of contributed computation.
    ComputationTime {
        min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    DaysActive {
        min: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Composite-score leaderboard position at or above `max_rank`.
    Ranking { max_rank: u32 },
    /// Average execution time within the fastest `100 - percentile` percent.
    AvgExecutionTime { percentile: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    pub id: i64,
    pub badge_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub icon: String,
    pub level: BadgeLevel,
    /// None when the stored JSON does not parse as a known rule.
    pub criteria: Option<BadgeCriteria>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog entry before insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBadge {
    pub badge_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub icon: String,
    pub level: BadgeLevel,
    pub criteria: BadgeCriteria,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerBadge {
    #[serde(default)]
    pub id: i64,
    pub volunteer_id: String,
    /// Row id of the badge in the catalog.
    pub badge_id: i64,
    pub earned_date: DateTime<Utc>,
    /// `week`, `month`, `year` or `all-time`.
    pub period: Option<String>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub metric_value: Option<f64>,
    pub rank: Option<i64>,
    pub notified: bool,
    pub notification_date: Option<DateTime<Utc>>,
    pub revoked: bool,
    pub revoked_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
}
