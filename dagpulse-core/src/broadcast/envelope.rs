use serde::{Deserialize, Serialize};

use crate::types::{BlockRecord, StatsSnapshot, TimeSeriesPoint};

/// Tagged payload delivered over the push channel.
///
/// Serialized as `{"type": "<tag>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BroadcastEnvelope {
    StatsUpdate(StatsSnapshot),
    NewBlock(BlockRecord),
    #[serde(rename = "hashrate_update")]
    TimeSeriesPoint(TimeSeriesPoint),
}

impl BroadcastEnvelope {
    /// Wire tag, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastEnvelope::StatsUpdate(_) => "stats_update",
            BroadcastEnvelope::NewBlock(_) => "new_block",
            BroadcastEnvelope::TimeSeriesPoint(_) => "hashrate_update",
        }
    }

    /// Serializes to a JSON text frame.
    ///
    /// # Errors
    ///
    /// - `serde_json::Error` - Payload cannot be represented as JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a JSON text frame.
    ///
    /// # Errors
    ///
    /// - `serde_json::Error` - Malformed frame or unknown tag
    pub fn from_json(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_tags() {
        let envelope = BroadcastEnvelope::TimeSeriesPoint(TimeSeriesPoint::new(7, 1.5));
        let json: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "hashrate_update");
        assert_eq!(json["data"]["timestamp"], 7);
        assert_eq!(envelope.kind(), "hashrate_update");
    }

    #[test]
    fn test_decode_by_tag() {
        let frame = r#"{"type":"hashrate_update","data":{"timestamp":3,"hashrate":9.0}}"#;
        assert_eq!(
            BroadcastEnvelope::from_json(frame).unwrap(),
            BroadcastEnvelope::TimeSeriesPoint(TimeSeriesPoint::new(3, 9.0))
        );
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let frame = r#"{"type":"chat","data":{}}"#;
        assert!(BroadcastEnvelope::from_json(frame).is_err());
    }
}
