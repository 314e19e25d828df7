// PeakDetector: samples at or above a threshold, highest first.

use super::aggregate::round2;
use super::field::{MetricField, Sample};
use crate::models::{PeakEvent, PeakReport};

pub fn detect<S: Sample>(
    samples: &[S],
    field: MetricField,
    threshold: f64,
    limit: usize,
) -> PeakReport {
    let mut peaks: Vec<PeakEvent> = samples
        .iter()
        .filter_map(|s| {
            let value = s.value(field);
            (value >= threshold).then(|| PeakEvent {
                timestamp: s.timestamp(),
                value,
            })
        })
        .collect();
    peaks.sort_by(|a, b| b.value.total_cmp(&a.value));

    let count = peaks.len();
    let highest = peaks.first().map(|p| p.value).unwrap_or(0.0);
    peaks.truncate(limit);
    for p in &mut peaks {
        p.value = round2(p.value);
    }

    PeakReport {
        metric: field.name().to_string(),
        threshold,
        count,
        highest: round2(highest),
        events: peaks,
    }
}
