// Wire protocol for the live telemetry feed
use serde::{Deserialize, Serialize};

/// Messages exchanged with the feed, discriminated by a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    /// Informational session header; establishes the declared sample rate.
    Meta {
        #[serde(rename = "sessionID")]
        session_id: String,
        series: Vec<String>,
        hz: f64,
    },
    /// One telemetry reading. Any channel may be absent.
    Point(PointPayload),
    /// Clean stream termination.
    End {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Heartbeat round-trip; latency = now - echoed timestamp.
    Ping { timestamp: f64 },
    Pong { timestamp: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    pub t: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_with_missing_channels() {
        let message: WireMessage =
            serde_json::from_str(r#"{"type":"point","t":12.5,"speed":31.0}"#).unwrap();
        match message {
            WireMessage::Point(p) => {
                assert_eq!(p.t, 12.5);
                assert_eq!(p.speed, Some(31.0));
                assert_eq!(p.current, None);
                assert_eq!(p.temp, None);
            }
            other => panic!("expected point, got {:?}", other),
        }
    }

    #[test]
    fn test_meta_session_id_casing() {
        let message: WireMessage = serde_json::from_str(
            r#"{"type":"meta","sessionID":"abc","series":["speed","temp"],"hz":4}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            WireMessage::Meta {
                session_id: "abc".to_string(),
                series: vec!["speed".to_string(), "temp".to_string()],
                hz: 4.0,
            }
        );
    }

    #[test]
    fn test_ping_roundtrip() {
        let ping = WireMessage::Ping { timestamp: 1000.5 };
        let text = serde_json::to_string(&ping).unwrap();
        assert!(text.contains(r#""type":"ping""#));
        assert_eq!(serde_json::from_str::<WireMessage>(&text).unwrap(), ping);
    }

    #[test]
    fn test_malformed_payloads_fail_to_parse() {
        assert!(serde_json::from_str::<WireMessage>("not json").is_err());
        assert!(serde_json::from_str::<WireMessage>(r#"{"type":"warp"}"#).is_err());
        assert!(serde_json::from_str::<WireMessage>(r#"{"type":"point"}"#).is_err());
    }

    #[test]
    fn test_end_reason_optional() {
        let message: WireMessage = serde_json::from_str(r#"{"type":"end"}"#).unwrap();
        assert_eq!(message, WireMessage::End { reason: None });
    }
}
