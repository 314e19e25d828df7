// TrendAnalyzer: compares the first and last sample of an ascending sequence.

use super::aggregate::round2;
use super::field::{MetricField, Sample};
use crate::models::{Trend, TrendDirection};

/// Percent change beyond which a trend is no longer stable.
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// Two-point trend of `field`. Fewer than two samples, or a zero first value, is stable at 0%.
/// Growth from a zero baseline is reported as stable.
pub fn analyze<S: Sample>(samples: &[S], field: MetricField) -> Trend {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Trend::default();
    };
    if samples.len() < 2 {
        return Trend::default();
    }
    let first_value = first.value(field);
    let last_value = last.value(field);
    if first_value == 0.0 {
        return Trend::default();
    }

    let pct = (last_value - first_value) / first_value * 100.0;
    let trend = if pct > TREND_THRESHOLD_PERCENT {
        TrendDirection::Increasing
    } else if pct < -TREND_THRESHOLD_PERCENT {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Trend {
        trend,
        percentage: round2(pct),
        first_value: Some(round2(first_value)),
        last_value: Some(round2(last_value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SystemMetrics;
    use chrono::{Duration, TimeZone, Utc};

    fn cpu(values: &[f64]) -> Vec<SystemMetrics> {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SystemMetrics {
                cpu_usage: *v,
                ..SystemMetrics::empty(t0 + Duration::minutes(i as i64))
            })
            .collect()
    }

    #[test]
    fn short_sequences_are_stable() {
        assert_eq!(analyze(&cpu(&[]), MetricField::CpuUsage), Trend::default());
        let one = analyze(&cpu(&[42.0]), MetricField::CpuUsage);
        assert_eq!(one.trend, TrendDirection::Stable);
        assert_eq!(one.percentage, 0.0);
        assert!(one.first_value.is_none());
        assert!(one.last_value.is_none());
    }

    #[test]
    fn fifty_to_eighty_is_sixty_percent_increase() {
        let t = analyze(&cpu(&[50.0, 80.0]), MetricField::CpuUsage);
        assert_eq!(t.trend, TrendDirection::Increasing);
        assert_eq!(t.percentage, 60.0);
        assert_eq!(t.first_value, Some(50.0));
        assert_eq!(t.last_value, Some(80.0));
    }

    #[test]
    fn only_endpoints_matter() {
        let t = analyze(&cpu(&[40.0, 99.0, 1.0, 30.0]), MetricField::CpuUsage);
        assert_eq!(t.trend, TrendDirection::Decreasing);
        assert_eq!(t.percentage, -25.0);
    }

    #[test]
    fn small_changes_are_stable() {
        let up = analyze(&cpu(&[100.0, 105.0]), MetricField::CpuUsage);
        assert_eq!(up.trend, TrendDirection::Stable);
        let down = analyze(&cpu(&[100.0, 95.0]), MetricField::CpuUsage);
        assert_eq!(down.trend, TrendDirection::Stable);
        let past = analyze(&cpu(&[100.0, 105.5]), MetricField::CpuUsage);
        assert_eq!(past.trend, TrendDirection::Increasing);
    }

    #[test]
    fn zero_baseline_is_stable() {
        let t = analyze(&cpu(&[0.0, 75.0]), MetricField::CpuUsage);
        assert_eq!(t.trend, TrendDirection::Stable);
        assert_eq!(t.percentage, 0.0);
    }
}
