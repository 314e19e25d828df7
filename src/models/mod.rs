// Domain models: stored entities and the shapes returned by the analytics core.

mod analytics;
mod badge;
mod system;
mod task;
mod volunteer;

pub use analytics::{
    Aggregate, PeakEvent, PeakReport, PeriodComparison, Trend, TrendDirection,
};
pub use badge::{Badge, BadgeCriteria, BadgeLevel, NewBadge, VolunteerBadge};
pub use system::SystemMetrics;
pub use task::{PerformanceHistory, Task, TaskStatus};
pub use volunteer::{Volunteer, VolunteerStatus};
