use crate::types::constants::frame_types;
use serde::de::{Deserializer, Error as DeError};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Frame type discriminator on the wire.
///
/// The manager originates `project_select`, `settings_update`, `ping` and
/// `pong` frames. Any other `type` string is a data frame carrying tracking
/// payload, routed to subscribers by its `project` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FrameKind {
    ProjectSelect,
    SettingsUpdate,
    Ping,
    Pong,
    Error,
    /// Data frame with a service-defined type string (e.g. "gesture_frame")
    Data(String),
}

impl FrameKind {
    pub fn parse(s: &str) -> Self {
        match s {
            frame_types::PROJECT_SELECT => Self::ProjectSelect,
            frame_types::SETTINGS_UPDATE => Self::SettingsUpdate,
            frame_types::PING => Self::Ping,
            frame_types::PONG => Self::Pong,
            frame_types::ERROR => Self::Error,
            _ => Self::Data(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::ProjectSelect => frame_types::PROJECT_SELECT,
            Self::SettingsUpdate => frame_types::SETTINGS_UPDATE,
            Self::Ping => frame_types::PING,
            Self::Pong => frame_types::PONG,
            Self::Error => frame_types::ERROR,
            Self::Data(s) => s,
        }
    }

    /// Whether this frame carries tracking data for subscriber fan-out
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

impl From<&str> for FrameKind {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for FrameKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FrameKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Err(D::Error::custom("empty frame type"));
        }
        Ok(Self::parse(&s))
    }
}

/// A single frame on the wire, in either direction.
///
/// Manager-originated frames always carry a `timestamp` (epoch millis) and a
/// unique `id`. Inbound data frames carry at minimum the `project`
/// discriminator used for routing; the payload itself is opaque to the
/// manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl StreamMessage {
    /// Create a manager-originated frame stamped with the current time and a
    /// fresh id.
    pub fn new(kind: FrameKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: Some(now_millis()),
            id: Some(uuid::Uuid::new_v4().to_string()),
            project: None,
        }
    }

    /// Ping probe frame; its timestamp doubles as the round-trip marker.
    pub fn ping() -> Self {
        Self::new(FrameKind::Ping, serde_json::Value::Null)
    }

    /// Pong reply echoing the timestamp of the ping it answers.
    pub fn pong_for(ping: &StreamMessage) -> Self {
        let mut pong = Self::new(FrameKind::Pong, serde_json::Value::Null);
        pong.timestamp = ping.timestamp;
        pong
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
