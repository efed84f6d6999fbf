//! Pipeline messages
//!
//! A [`Message`] is the unit the host pipeline delivers to a timer and
//! receives back on the output ports. Besides the payload it carries the
//! re-entry marker and any extra fields the pipeline attached, which are
//! preserved in every clone the engine emits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payloads that cancel a running timer.
pub const STOP_PAYLOADS: [&str; 2] = ["stop", "STOP"];

/// Payload of the notification emitted on cancel.
pub const STOPPED_PAYLOAD: &str = "stopped";

/// Field added to progress messages with the formatted remaining time.
pub const REMAINING_FIELD: &str = "remaining";

/// A message flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Message payload; absent payloads are `null`
    #[serde(default)]
    pub payload: Value,

    /// Set once a timer has accepted this message as a trigger.
    ///
    /// A marked message that comes back to a stopped timer is ignored.
    #[serde(rename = "_timerpass", default, skip_serializing_if = "std::ops::Not::not")]
    pub timer_pass: bool,

    /// Any other fields on the message
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Message {
    /// Creates a message with the given payload and no extra fields.
    #[must_use]
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Adds an extra field, builder style.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns whether this message asks the timer to stop.
    ///
    /// Only the exact strings `"stop"` and `"STOP"` qualify.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.payload
            .as_str()
            .is_some_and(|s| STOP_PAYLOADS.contains(&s))
    }

    /// Returns a clone with the payload replaced.
    #[must_use]
    pub fn with_payload(&self, payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
            ..self.clone()
        }
    }

    /// Returns the value of an extra field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Parses one line of host input.
    ///
    /// A JSON object is read as a full message; any other line becomes a
    /// string payload. Returns `None` for blank lines.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('{') {
            if let Ok(message) = serde_json::from_str::<Self>(trimmed) {
                return Some(message);
            }
        }
        Some(Self::new(trimmed))
    }
}
