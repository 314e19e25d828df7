// PeriodComparator: the same field aggregated over two windows.

use super::AnalyticsError;
use super::aggregate::{round2, summarize};
use super::field::{MetricField, Sample};
use crate::models::PeriodComparison;

/// Compare `field` between `period1` (baseline) and `period2`. Both must be non-empty.
pub fn compare<A: Sample, B: Sample>(
    period1: &[A],
    period2: &[B],
    field: MetricField,
    lower_is_better: bool,
) -> Result<PeriodComparison, AnalyticsError> {
    if period1.is_empty() || period2.is_empty() {
        return Err(AnalyticsError::InsufficientData(format!(
            "both periods need samples to compare {} (got {} and {})",
            field,
            period1.len(),
            period2.len()
        )));
    }

    let p1 = summarize(period1, field);
    let p2 = summarize(period2, field);
    let difference = p2.average - p1.average;
    let percentage_change = if p1.average == 0.0 {
        0.0
    } else {
        difference / p1.average * 100.0
    };
    let improved = if lower_is_better {
        difference < 0.0
    } else {
        difference > 0.0
    };

    Ok(PeriodComparison {
        metric: field.name().to_string(),
        lower_is_better,
        period1: p1.rounded(),
        period2: p2.rounded(),
        difference: round2(difference),
        percentage_change: round2(percentage_change),
        improved,
    })
}

/// [`compare`] using the field's own lower-is-better policy.
pub fn compare_field<A: Sample, B: Sample>(
    period1: &[A],
    period2: &[B],
    field: MetricField,
) -> Result<PeriodComparison, AnalyticsError> {
    compare(period1, period2, field, field.lower_is_better())
}
