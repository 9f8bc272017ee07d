// Aggregator - visibility-masked reduction over a sample sequence
use crate::domain::sample::{AggregateReport, Channel, ChannelSummary, Sample, SeriesVisibility};

/// Compute `{avg, max, last}` per enabled channel. Disabled channels and
/// empty input report zero-valued placeholders. Stateless; recomputed each
/// time its inputs change, which batching bounds to the flush frequency.
pub fn aggregate(samples: &[Sample], visibility: SeriesVisibility) -> AggregateReport {
    let mut report = AggregateReport::default();
    let Some(last) = samples.last() else {
        return report;
    };

    for channel in Channel::ALL {
        if !visibility.is_enabled(channel) {
            continue;
        }
        let mut sum = 0.0;
        let mut max = f64::NEG_INFINITY;
        for sample in samples {
            let value = sample.channel(channel);
            sum += value;
            if value > max {
                max = value;
            }
        }
        *report.channel_mut(channel) = ChannelSummary {
            avg: sum / samples.len() as f64,
            max,
            last: last.channel(channel),
        };
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_placeholders() {
        let report = aggregate(&[], SeriesVisibility::default());
        assert_eq!(report, AggregateReport::default());
    }

    #[test]
    fn test_per_channel_reduction() {
        let samples = vec![
            Sample::new(0.0, 10.0, 40.0, 55.0),
            Sample::new(1.0, 30.0, 80.0, 45.0),
            Sample::new(2.0, 20.0, 60.0, 50.0),
        ];
        let report = aggregate(&samples, SeriesVisibility::default());

        assert_eq!(report.speed.avg, 20.0);
        assert_eq!(report.speed.max, 30.0);
        assert_eq!(report.speed.last, 20.0);
        assert_eq!(report.current.max, 80.0);
        assert_eq!(report.temp.avg, 50.0);
    }

    #[test]
    fn test_disabled_channel_reports_zeros() {
        let samples = vec![Sample::new(0.0, 10.0, 40.0, 55.0)];
        let mut visibility = SeriesVisibility::default();
        visibility.toggle(Channel::Current);

        let report = aggregate(&samples, visibility);
        assert_eq!(report.current, ChannelSummary::default());
        assert_eq!(report.speed.last, 10.0);
    }
}
