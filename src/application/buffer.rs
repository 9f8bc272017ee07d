// Bounded ingestion buffer with batched delivery
use crate::domain::sample::Sample;
use std::collections::VecDeque;

/// Time-ordered in-memory history with a hard capacity. Writes go through a
/// pending batch so observers only ever see whole-flush state; overflow is
/// evicted oldest-first in one batch, not one-for-one.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    pending: Vec<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            pending: Vec::new(),
            capacity,
        }
    }

    /// Stage a sample for the next flush. Arrival order is time order; the
    /// buffer never reorders.
    pub fn append(&mut self, sample: Sample) {
        self.pending.push(sample);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Move the pending batch into the buffer as one atomic unit, then drop
    /// the oldest entries above capacity. No-op on an empty batch. Returns
    /// the number of samples flushed.
    pub fn flush(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let flushed = self.pending.len();
        self.samples.extend(self.pending.drain(..));
        if self.samples.len() > self.capacity {
            let excess = self.samples.len() - self.capacity;
            self.samples.drain(..excess);
            tracing::debug!(evicted = excess, "buffer at capacity, evicted oldest samples");
        }
        flushed
    }

    /// Drop both the history and the pending batch. Connection state is not
    /// this buffer's concern.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn min_t(&self) -> Option<f64> {
        self.samples.front().map(|s| s.t)
    }

    pub fn max_t(&self) -> Option<f64> {
        self.samples.back().map(|s| s.t)
    }

    /// Newest timestamp including samples still staged for the next flush.
    pub fn latest_t(&self) -> Option<f64> {
        self.pending
            .last()
            .map(|s| s.t)
            .or_else(|| self.samples.back().map(|s| s.t))
    }

    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    /// Samples with `x_min <= t <= x_max`, located by binary search over the
    /// time-ordered history.
    pub fn visible(&self, x_min: f64, x_max: f64) -> Vec<Sample> {
        let start = self.samples.partition_point(|s| s.t < x_min);
        let end = self.samples.partition_point(|s| s.t <= x_max);
        self.samples
            .iter()
            .skip(start)
            .take(end.saturating_sub(start))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> Sample {
        Sample::new(t, t, t, t)
    }

    #[test]
    fn test_flush_moves_pending_atomically() {
        let mut buffer = SampleBuffer::new(100);
        for i in 0..10 {
            buffer.append(sample(i as f64));
        }
        // Nothing observable until the flush.
        assert_eq!(buffer.len(), 0);
        assert_eq!(buffer.pending_len(), 10);

        assert_eq!(buffer.flush(), 10);
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.pending_len(), 0);
        assert_eq!(buffer.min_t(), Some(0.0));
        assert_eq!(buffer.max_t(), Some(9.0));
    }

    #[test]
    fn test_flush_empty_batch_is_noop() {
        let mut buffer = SampleBuffer::new(100);
        buffer.append(sample(1.0));
        buffer.flush();
        let before = buffer.snapshot();

        assert_eq!(buffer.flush(), 0);
        assert_eq!(buffer.snapshot(), before);
    }

    #[test]
    fn test_capacity_bound_with_batch_eviction() {
        let mut buffer = SampleBuffer::new(5);
        for i in 0..8 {
            buffer.append(sample(i as f64));
        }
        buffer.flush();

        assert_eq!(buffer.len(), 5);
        // Retained tail is exactly the most recent samples in arrival order.
        let times: Vec<f64> = buffer.snapshot().iter().map(|s| s.t).collect();
        assert_eq!(times, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_overflow_scenario_150k_appends() {
        let capacity = 120_000;
        let mut buffer = SampleBuffer::new(capacity);
        for i in 0..150_000 {
            buffer.append(sample(i as f64 * 0.25));
            // Flush periodically the way the batch timer would.
            if i % 1000 == 999 {
                buffer.flush();
            }
        }
        buffer.flush();

        assert_eq!(buffer.len(), capacity);
        // First retained sample is the 30,001st appended one.
        assert_eq!(buffer.min_t(), Some(30_000.0 * 0.25));
        assert_eq!(buffer.max_t(), Some(149_999.0 * 0.25));
    }

    #[test]
    fn test_visible_range_query() {
        let mut buffer = SampleBuffer::new(100);
        for i in 0..50 {
            buffer.append(sample(i as f64));
        }
        buffer.flush();

        let visible = buffer.visible(10.0, 20.0);
        assert_eq!(visible.len(), 11);
        assert_eq!(visible.first().map(|s| s.t), Some(10.0));
        assert_eq!(visible.last().map(|s| s.t), Some(20.0));

        assert!(buffer.visible(100.0, 200.0).is_empty());
    }

    #[test]
    fn test_clear_resets_history_and_pending() {
        let mut buffer = SampleBuffer::new(10);
        buffer.append(sample(1.0));
        buffer.flush();
        buffer.append(sample(2.0));

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.pending_len(), 0);
        assert_eq!(buffer.flush(), 0);
    }
}
