// Aggregator: count/average/min/max/total of one field. Rounding happens only on output.

use super::field::{MetricField, Sample};
use crate::models::Aggregate;

/// Round to 2 decimal digits for presentation.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl Aggregate {
    /// Unrounded statistics; an empty input gives all zeros.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut count = 0usize;
        let mut total = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            total += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Aggregate::default();
        }
        Aggregate {
            count,
            average: total / count as f64,
            min,
            max,
            total,
        }
    }

    pub fn rounded(self) -> Self {
        Aggregate {
            count: self.count,
            average: round2(self.average),
            min: round2(self.min),
            max: round2(self.max),
            total: round2(self.total),
        }
    }
}

/// Unrounded aggregate, for chaining into further computation.
pub fn summarize<S: Sample>(samples: &[S], field: MetricField) -> Aggregate {
    Aggregate::from_values(samples.iter().map(|s| s.value(field)))
}

/// Presentation aggregate (2-decimal rounding).
pub fn aggregate<S: Sample>(samples: &[S], field: MetricField) -> Aggregate {
    summarize(samples, field).rounded()
}
