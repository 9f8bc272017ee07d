// Downsampling engine - LTTB and min-max decimation
use crate::domain::sample::{Channel, Sample};
use serde::Deserialize;

/// Strategy selection is a caller decision, not engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownsampleStrategy {
    Lttb,
    MinMax,
}

/// Reduce `samples` to at most the rendering budget. Both strategies only
/// ever return a subset of the real input points, in input order, with the
/// first and last points preserved.
pub fn downsample(
    samples: &[Sample],
    budget: usize,
    strategy: DownsampleStrategy,
    channel: Channel,
) -> Vec<Sample> {
    match strategy {
        DownsampleStrategy::Lttb => lttb(samples, budget, channel),
        DownsampleStrategy::MinMax => min_max(samples, budget),
    }
}

/// Largest-Triangle-Three-Buckets keyed on one representative channel.
///
/// Interior points are split into `budget - 2` fractional buckets; within
/// each bucket the point forming the largest triangle with the previously
/// selected point and the next bucket's centroid wins. Returns the input
/// unchanged when it already fits the budget or the budget cannot hold the
/// endpoints plus an interior.
pub fn lttb(samples: &[Sample], budget: usize, channel: Channel) -> Vec<Sample> {
    let n = samples.len();
    if n <= budget || budget <= 2 {
        return samples.to_vec();
    }

    let mut selected = Vec::with_capacity(budget);
    selected.push(samples[0]);

    let bucket_size = (n - 2) as f64 / (budget - 2) as f64;
    let mut prev = 0usize;

    for i in 0..(budget - 2) {
        let bucket_start = (i as f64 * bucket_size).floor() as usize + 1;
        let bucket_end = (((i as f64 + 1.0) * bucket_size).floor() as usize + 1).min(n - 1);

        // Centroid of the next bucket; for the final bucket this degenerates
        // to the fixed last point.
        let next_start = bucket_end;
        let next_end = (((i as f64 + 2.0) * bucket_size).floor() as usize + 1).min(n);
        let (avg_t, avg_y) = if next_start < next_end {
            let count = (next_end - next_start) as f64;
            let (sum_t, sum_y) = samples[next_start..next_end]
                .iter()
                .fold((0.0, 0.0), |acc, s| (acc.0 + s.t, acc.1 + s.channel(channel)));
            (sum_t / count, sum_y / count)
        } else {
            let last = samples[n - 1];
            (last.t, last.channel(channel))
        };

        let a_t = samples[prev].t;
        let a_y = samples[prev].channel(channel);
        let mut max_area = -1.0f64;
        let mut max_idx = bucket_start;
        for (j, s) in samples.iter().enumerate().take(bucket_end).skip(bucket_start) {
            let area =
                ((a_t - avg_t) * (s.channel(channel) - a_y) - (a_t - s.t) * (avg_y - a_y)).abs();
            if area > max_area {
                max_area = area;
                max_idx = j;
            }
        }

        selected.push(samples[max_idx]);
        prev = max_idx;
    }

    selected.push(samples[n - 1]);
    selected
}

/// Min-max bucketing on the summed-channel scalar: fixed buckets of
/// `ceil(n / target)` points, each contributing its extremes in time order.
/// The first and last input points are always part of the output.
pub fn min_max(samples: &[Sample], target: usize) -> Vec<Sample> {
    let n = samples.len();
    if target == 0 || n <= target {
        return samples.to_vec();
    }

    let bucket_size = n.div_ceil(target);
    let mut selected = Vec::with_capacity(2 * target);
    let chunk_count = n.div_ceil(bucket_size);

    for (chunk_idx, chunk) in samples.chunks(bucket_size).enumerate() {
        if chunk.len() == 1 {
            selected.push(chunk[0]);
            continue;
        }

        let mut min_idx = 0usize;
        let mut max_idx = 0usize;
        for (j, s) in chunk.iter().enumerate() {
            if s.combined() < chunk[min_idx].combined() {
                min_idx = j;
            }
            if s.combined() > chunk[max_idx].combined() {
                max_idx = j;
            }
        }

        let (mut first, mut second) = if min_idx <= max_idx {
            (min_idx, max_idx)
        } else {
            (max_idx, min_idx)
        };
        // Endpoints are fixed regardless of extremeness.
        if chunk_idx == 0 {
            first = 0;
        }
        if chunk_idx == chunk_count - 1 {
            second = chunk.len() - 1;
        }

        selected.push(chunk[first]);
        if second > first {
            selected.push(chunk[second]);
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let t = i as f64;
                Sample::new(t, (t * 0.7).sin() * 20.0 + 30.0, t % 13.0, 50.0)
            })
            .collect()
    }

    #[test]
    fn test_lttb_identity_under_budget() {
        let samples = ramp(50);
        assert_eq!(lttb(&samples, 50, Channel::Speed), samples);
        assert_eq!(lttb(&samples, 100, Channel::Speed), samples);
        assert_eq!(lttb(&samples, 2, Channel::Speed), samples);
    }

    #[test]
    fn test_lttb_ten_points_budget_five() {
        let samples = ramp(10);
        let out = lttb(&samples, 5, Channel::Speed);

        assert_eq!(out.len(), 5);
        assert_eq!(out[0], samples[0]);
        assert_eq!(out[4], samples[9]);
    }

    #[test]
    fn test_lttb_endpoints_and_order() {
        let samples = ramp(5000);
        let out = lttb(&samples, 200, Channel::Speed);

        assert_eq!(out.len(), 200);
        assert_eq!(out.first(), samples.first());
        assert_eq!(out.last(), samples.last());
        assert!(out.windows(2).all(|w| w[0].t < w[1].t));
    }

    #[test]
    fn test_lttb_keeps_spike() {
        let mut samples = ramp(1000);
        samples[437].speed = 10_000.0;
        let out = lttb(&samples, 50, Channel::Speed);
        assert!(out.iter().any(|s| s.speed == 10_000.0));
    }

    #[test]
    fn test_min_max_identity_under_target() {
        let samples = ramp(30);
        assert_eq!(min_max(&samples, 30), samples);
        assert_eq!(min_max(&samples, 100), samples);
    }

    #[test]
    fn test_min_max_bounds_endpoints_and_order() {
        let samples = ramp(5000);
        let target = 100;
        let out = min_max(&samples, target);

        assert!(out.len() <= 2 * target);
        assert_eq!(out.first(), samples.first());
        assert_eq!(out.last(), samples.last());
        assert!(out.windows(2).all(|w| w[0].t < w[1].t));
    }

    #[test]
    fn test_min_max_keeps_combined_extremes() {
        let mut samples = ramp(1000);
        samples[500].current = 5_000.0;
        let out = min_max(&samples, 50);
        assert!(out.iter().any(|s| s.current == 5_000.0));
    }

    #[test]
    fn test_strategy_dispatch() {
        let samples = ramp(100);
        let via_lttb = downsample(&samples, 10, DownsampleStrategy::Lttb, Channel::Speed);
        let via_minmax = downsample(&samples, 10, DownsampleStrategy::MinMax, Channel::Speed);
        assert_eq!(via_lttb.len(), 10);
        assert!(via_minmax.len() <= 20);
    }
}
