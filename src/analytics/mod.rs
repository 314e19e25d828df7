// Pure reducers over time-series samples, plus the store seam they read through.

pub mod aggregate;
pub mod badges;
pub mod compare;
pub mod field;
pub mod peaks;
pub mod ranking;
pub mod report;
pub mod source;
pub mod trend;
pub mod window;

pub use field::{MetricField, Sample};
pub use source::MetricsSource;
pub use window::{Period, Window};

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("invalid ISO-8601 date/time: {value:?}")]
    InvalidDate { value: String },

    #[error("custom period requires both start_date and end_date")]
    MissingBounds,

    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("no data: {0}")]
    NoData(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
