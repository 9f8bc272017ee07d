// Engine configuration
use crate::application::downsample::DownsampleStrategy;
use crate::domain::sample::Channel;
use serde::Deserialize;

/// How ingestion normalizes a `point` message that omits a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingChannelPolicy {
    /// Fill the gap with the last known value for that channel.
    CarryForward,
    /// Drop any point missing a currently enabled channel.
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// WebSocket feed URL. When unset the engine runs in synthetic demo mode.
    pub feed_url: Option<String>,
    pub listen_addr: String,
    /// Declared sample rate until a `meta` message overrides it.
    pub sample_rate_hz: f64,
    pub buffer_capacity: usize,
    pub batch_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub max_reconnect_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub synthetic_fallback: bool,
    pub synthetic_tick_ms: u64,
    pub playback_rate: f64,
    pub zoom_sensitivity: f64,
    pub min_zoom_span: f64,
    pub follow_window_secs: f64,
    pub y_ceiling: f64,
    /// Visible-point count above which decimation kicks in.
    pub downsample_threshold: usize,
    pub downsample_budget: usize,
    pub downsample_strategy: DownsampleStrategy,
    /// Representative channel for LTTB.
    pub lttb_channel: Channel,
    pub missing_channel_policy: MissingChannelPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            listen_addr: "0.0.0.0:8080".to_string(),
            sample_rate_hz: 4.0,
            buffer_capacity: 120_000,
            batch_interval_ms: 100,
            heartbeat_interval_ms: 5000,
            max_reconnect_attempts: 3,
            backoff_base_ms: 1000,
            backoff_cap_ms: 30_000,
            synthetic_fallback: true,
            synthetic_tick_ms: 50,
            playback_rate: 1.0,
            zoom_sensitivity: 0.1,
            min_zoom_span: 2.0,
            follow_window_secs: 30.0,
            y_ceiling: 120.0,
            downsample_threshold: 1000,
            downsample_budget: 1000,
            downsample_strategy: DownsampleStrategy::Lttb,
            lttb_channel: Channel::Speed,
            missing_channel_policy: MissingChannelPolicy::CarryForward,
        }
    }
}

/// `config/engine.toml` plus `TELEMETRY_*` environment overrides; every
/// field has a default so a missing file is fine.
pub fn load_engine_config() -> anyhow::Result<EngineConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/engine").required(false))
        .add_source(config::Environment::with_prefix("TELEMETRY"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_contract() {
        let config = EngineConfig::default();
        assert_eq!(config.buffer_capacity, 120_000);
        assert_eq!(config.batch_interval_ms, 100);
        assert_eq!(config.heartbeat_interval_ms, 5000);
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.backoff_base_ms, 1000);
        assert_eq!(config.backoff_cap_ms, 30_000);
        assert!(config.synthetic_fallback);
        assert_eq!(config.zoom_sensitivity, 0.1);
        assert_eq!(config.min_zoom_span, 2.0);
        assert_eq!(config.downsample_threshold, 1000);
        assert_eq!(config.missing_channel_policy, MissingChannelPolicy::CarryForward);
    }

    #[test]
    fn test_deserialize_with_partial_overrides() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"buffer_capacity": 500, "missing_channel_policy": "reject"}"#,
        )
        .unwrap();
        assert_eq!(config.buffer_capacity, 500);
        assert_eq!(config.missing_channel_policy, MissingChannelPolicy::Reject);
        // Untouched fields keep their defaults.
        assert_eq!(config.batch_interval_ms, 100);
    }
}
