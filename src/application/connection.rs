// Connection supervisor - lifecycle state machine for the live source
use crate::domain::connection::ConnectionState;
use std::time::Duration;

/// What the engine should do after losing the live source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossDecision {
    /// Schedule another connect attempt after the backoff delay.
    Retry(Duration),
    /// Switch to the synthetic generator. Sticky until a manual reconnect.
    Degrade,
    /// Retry budget exhausted with fallback disabled; stay disconnected.
    GiveUp,
}

/// Pure decision logic for the reconnect lifecycle; the engine loop owns the
/// actual timers so teardown can cancel them uniformly.
#[derive(Debug)]
pub struct ConnectionSupervisor {
    state: ConnectionState,
    attempts: u32,
    latency_ms: Option<f64>,
    max_attempts: u32,
    backoff_base_ms: u64,
    backoff_cap_ms: u64,
    fallback_enabled: bool,
}

impl ConnectionSupervisor {
    pub fn new(max_attempts: u32, backoff_base_ms: u64, backoff_cap_ms: u64, fallback_enabled: bool) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            latency_ms: None,
            max_attempts,
            backoff_base_ms,
            backoff_cap_ms,
            fallback_enabled,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency_ms
    }

    pub fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// Handshake succeeded: reset the retry counter, start measuring latency
    /// from scratch.
    pub fn on_established(&mut self) {
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.latency_ms = None;
    }

    pub fn record_latency(&mut self, latency_ms: f64) {
        self.latency_ms = Some(latency_ms);
    }

    /// The source closed or errored. With fallback enabled this degrades
    /// immediately; otherwise the backoff schedule runs until the attempt
    /// budget is spent.
    pub fn on_lost(&mut self) -> LossDecision {
        self.latency_ms = None;
        if self.fallback_enabled {
            self.state = ConnectionState::Degraded;
            return LossDecision::Degrade;
        }

        let delay = self.backoff_delay(self.attempts);
        self.attempts += 1;
        if self.attempts < self.max_attempts {
            self.state = ConnectionState::Connecting;
            LossDecision::Retry(delay)
        } else {
            self.state = ConnectionState::Disconnected;
            LossDecision::GiveUp
        }
    }

    /// `min(base * 2^attempts, cap)` milliseconds.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempts);
        let ms = self.backoff_base_ms.saturating_mul(factor).min(self.backoff_cap_ms);
        Duration::from_millis(ms)
    }

    /// Explicit demo mode or fallback entry without a live source.
    pub fn enter_degraded(&mut self) {
        self.state = ConnectionState::Degraded;
        self.latency_ms = None;
    }

    /// Manual reconnect action: never automatic from Degraded. Resets the
    /// attempt counter.
    pub fn reconnect(&mut self) {
        self.attempts = 0;
        self.state = ConnectionState::Connecting;
    }

    pub fn shutdown(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.latency_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence() {
        let supervisor = ConnectionSupervisor::new(3, 1000, 30_000, false);
        assert_eq!(supervisor.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(supervisor.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(supervisor.backoff_delay(2), Duration::from_millis(4000));
        // Capped well before overflow territory.
        assert_eq!(supervisor.backoff_delay(10), Duration::from_millis(30_000));
        assert_eq!(supervisor.backoff_delay(500), Duration::from_millis(30_000));
    }

    #[test]
    fn test_retry_budget_without_fallback() {
        let mut supervisor = ConnectionSupervisor::new(3, 1000, 30_000, false);
        supervisor.begin_connect();

        assert_eq!(
            supervisor.on_lost(),
            LossDecision::Retry(Duration::from_millis(1000))
        );
        assert_eq!(supervisor.state(), ConnectionState::Connecting);

        assert_eq!(
            supervisor.on_lost(),
            LossDecision::Retry(Duration::from_millis(2000))
        );

        // Third loss exhausts the budget: terminal disconnected, nothing
        // scheduled.
        assert_eq!(supervisor.on_lost(), LossDecision::GiveUp);
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_fallback_degrades_immediately() {
        let mut supervisor = ConnectionSupervisor::new(3, 1000, 30_000, true);
        supervisor.begin_connect();

        assert_eq!(supervisor.on_lost(), LossDecision::Degrade);
        assert_eq!(supervisor.state(), ConnectionState::Degraded);

        // Degraded is sticky; a later loss never schedules a retry.
        assert_eq!(supervisor.on_lost(), LossDecision::Degrade);
        assert_eq!(supervisor.state(), ConnectionState::Degraded);
    }

    #[test]
    fn test_established_resets_attempts() {
        let mut supervisor = ConnectionSupervisor::new(3, 1000, 30_000, false);
        supervisor.begin_connect();
        supervisor.on_lost();
        supervisor.on_lost();
        supervisor.on_established();
        assert_eq!(supervisor.state(), ConnectionState::Connected);

        // Counter is back to zero, so the schedule starts over.
        assert_eq!(
            supervisor.on_lost(),
            LossDecision::Retry(Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_manual_reconnect_from_degraded() {
        let mut supervisor = ConnectionSupervisor::new(3, 1000, 30_000, true);
        supervisor.begin_connect();
        supervisor.on_lost();
        assert_eq!(supervisor.state(), ConnectionState::Degraded);

        supervisor.reconnect();
        assert_eq!(supervisor.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_latency_cleared_on_loss() {
        let mut supervisor = ConnectionSupervisor::new(3, 1000, 30_000, true);
        supervisor.begin_connect();
        supervisor.on_established();
        supervisor.record_latency(12.5);
        assert_eq!(supervisor.latency_ms(), Some(12.5));

        supervisor.on_lost();
        assert_eq!(supervisor.latency_ms(), None);
    }
}
