// Synthetic sample generator - demo mode and degraded-connectivity fallback
use crate::domain::sample::Sample;
use rand::Rng;

#[derive(Debug, Clone, Copy)]
struct ChannelShape {
    base: f64,
    freq: f64,
    amplitude: f64,
    noise: f64,
}

const SPEED_SHAPE: ChannelShape = ChannelShape {
    base: 30.0,
    freq: 0.1,
    amplitude: 15.0,
    noise: 5.0,
};
const CURRENT_SHAPE: ChannelShape = ChannelShape {
    base: 60.0,
    freq: 0.15,
    amplitude: 25.0,
    noise: 10.0,
};
const TEMP_SHAPE: ChannelShape = ChannelShape {
    base: 50.0,
    freq: 0.05,
    amplitude: 20.0,
    noise: 8.0,
};

/// Deterministic-shape, randomized-amplitude generator. The simulated clock
/// only advances when `tick` is called, so pausing playback pauses simulated
/// time for free.
#[derive(Debug)]
pub struct SyntheticGenerator {
    sim_clock: f64,
    step: f64,
}

impl SyntheticGenerator {
    /// `step` is `tick_ms / 1000 * playback_rate` seconds of simulated time
    /// per tick.
    pub fn new(tick_ms: u64, playback_rate: f64) -> Self {
        Self {
            sim_clock: 0.0,
            step: tick_ms as f64 / 1000.0 * playback_rate,
        }
    }

    /// Jump the clock forward so synthetic samples continue after the last
    /// live timestamp instead of rewinding the buffer's time axis. Never
    /// moves backwards.
    pub fn resume_from(&mut self, t: f64) {
        if t > self.sim_clock {
            self.sim_clock = t;
        }
    }

    pub fn tick(&mut self) -> Sample {
        self.sim_clock += self.step;
        let clock = self.sim_clock;
        let mut rng = rand::thread_rng();
        let mut emit = |shape: ChannelShape| -> f64 {
            let value = shape.base
                + (clock * shape.freq).sin() * shape.amplitude
                + rng.gen_range(-shape.noise..=shape.noise);
            value.max(0.0)
        };
        Sample::new(clock, emit(SPEED_SHAPE), emit(CURRENT_SHAPE), emit(TEMP_SHAPE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_by_scaled_step() {
        let mut generator = SyntheticGenerator::new(50, 2.0);
        let first = generator.tick();
        let second = generator.tick();
        assert!((first.t - 0.1).abs() < 1e-12);
        assert!((second.t - first.t - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_values_are_plausible_and_non_negative() {
        let mut generator = SyntheticGenerator::new(50, 1.0);
        for _ in 0..500 {
            let sample = generator.tick();
            assert!(sample.speed >= 0.0 && sample.speed <= 30.0 + 15.0 + 5.0);
            assert!(sample.current >= 0.0 && sample.current <= 60.0 + 25.0 + 10.0);
            assert!(sample.temp >= 0.0 && sample.temp <= 50.0 + 20.0 + 8.0);
        }
    }

    #[test]
    fn test_resume_never_rewinds() {
        let mut generator = SyntheticGenerator::new(50, 1.0);
        generator.resume_from(100.0);
        assert!(generator.tick().t > 100.0);

        // A smaller resume point is ignored.
        generator.resume_from(5.0);
        assert!(generator.tick().t > 100.0);
    }
}
