// Volunteer machines contributing compute.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolunteerStatus {
    Active,
    #[default]
    Inactive,
    Busy,
}

impl VolunteerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolunteerStatus::Active => "active",
            VolunteerStatus::Inactive => "inactive",
            VolunteerStatus::Busy => "busy",
        }
    }

    /// Active or busy: the volunteer is currently connected.
    pub fn is_online(&self) -> bool {
        matches!(self, VolunteerStatus::Active | VolunteerStatus::Busy)
    }
}

impl fmt::Display for VolunteerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolunteerStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(VolunteerStatus::Active),
            "inactive" => Ok(VolunteerStatus::Inactive),
            "busy" => Ok(VolunteerStatus::Busy),
            other => anyhow::bail!("unknown volunteer status: {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volunteer {
    #[serde(default)]
    pub id: i64,
    pub volunteer_id: String,
    pub name: String,
    pub status: VolunteerStatus,
    pub joined_date: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub tasks_completed: i64,
    /// Hours of computation contributed.
    pub total_computation_time: f64,
    pub cpu_cores: i64,
    pub memory_gb: f64,
    pub performance_score: f64,
}

impl Volunteer {
    /// Whole days since the volunteer joined (0 if joined_date is in the future).
    pub fn days_active(&self, now: DateTime<Utc>) -> i64 {
        (now - self.joined_date).num_days().max(0)
    }
}
