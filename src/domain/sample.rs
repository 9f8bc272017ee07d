// Telemetry sample domain models
use serde::{Deserialize, Serialize};

/// One timestamped multi-channel telemetry reading. Immutable once created;
/// `t` is seconds and is non-decreasing by construction of the sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub t: f64,
    pub speed: f64,
    pub current: f64,
    pub temp: f64,
}

impl Sample {
    pub fn new(t: f64, speed: f64, current: f64, temp: f64) -> Self {
        Self {
            t,
            speed,
            current,
            temp,
        }
    }

    pub fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Speed => self.speed,
            Channel::Current => self.current,
            Channel::Temp => self.temp,
        }
    }

    /// Sum of all channels, used as the scalar "extremeness" proxy by the
    /// min-max downsampler.
    pub fn combined(&self) -> f64 {
        self.speed + self.current + self.temp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Speed,
    Current,
    Temp,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Speed, Channel::Current, Channel::Temp];
}

/// Which series are enabled for aggregation and rendering. Never affects
/// storage or eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesVisibility {
    pub speed: bool,
    pub current: bool,
    pub temp: bool,
}

impl SeriesVisibility {
    pub fn is_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Speed => self.speed,
            Channel::Current => self.current,
            Channel::Temp => self.temp,
        }
    }

    pub fn toggle(&mut self, channel: Channel) {
        match channel {
            Channel::Speed => self.speed = !self.speed,
            Channel::Current => self.current = !self.current,
            Channel::Temp => self.temp = !self.temp,
        }
    }
}

impl Default for SeriesVisibility {
    fn default() -> Self {
        Self {
            speed: true,
            current: true,
            temp: true,
        }
    }
}

/// Per-channel reduction over a sample sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelSummary {
    pub avg: f64,
    pub max: f64,
    pub last: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateReport {
    pub speed: ChannelSummary,
    pub current: ChannelSummary,
    pub temp: ChannelSummary,
}

impl AggregateReport {
    pub fn channel(&self, channel: Channel) -> &ChannelSummary {
        match channel {
            Channel::Speed => &self.speed,
            Channel::Current => &self.current,
            Channel::Temp => &self.temp,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelSummary {
        match channel {
            Channel::Speed => &mut self.speed,
            Channel::Current => &mut self.current,
            Channel::Temp => &mut self.temp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_toggle() {
        let mut visibility = SeriesVisibility::default();
        assert!(visibility.is_enabled(Channel::Current));

        visibility.toggle(Channel::Current);
        assert!(!visibility.is_enabled(Channel::Current));
        assert!(visibility.is_enabled(Channel::Speed));
        assert!(visibility.is_enabled(Channel::Temp));
    }

    #[test]
    fn test_combined_is_channel_sum() {
        let sample = Sample::new(1.0, 10.0, 20.0, 30.0);
        assert_eq!(sample.combined(), 60.0);
    }
}
