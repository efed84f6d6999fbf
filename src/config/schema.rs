//! Configuration schema types
//!
//! A timer node is configured with a duration magnitude, a unit name and a
//! completion payload with its declared type. Values are kept as configured;
//! normalization happens once in [`TimerSettings`](crate::timer::TimerSettings).

use serde::{Deserialize, Deserializer, Serialize};

/// Default duration magnitude.
pub const DEFAULT_DURATION: f64 = 5.0;

/// Default duration unit.
pub const DEFAULT_UNITS: &str = "Second";

/// Default completion payload.
pub const DEFAULT_PAYLOAD: &str = "0";

// ============================================================================
// Timer Configuration
// ============================================================================

/// Root configuration for a timer node.
///
/// ```yaml
/// duration: 90
/// units: Second
/// payload: "done"
/// payload_type: str
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimerConfig {
    /// Duration magnitude. Numeric strings are accepted; anything else is `0`.
    #[serde(default = "default_duration", deserialize_with = "lenient_magnitude")]
    pub duration: f64,

    /// Unit name (`Second`, `Minute`, `Hour`). Unknown names mean milliseconds.
    #[serde(default = "default_units")]
    pub units: String,

    /// Completion payload as configured.
    #[serde(default = "default_payload", deserialize_with = "scalar_to_string")]
    pub payload: String,

    /// Declared type of the completion payload.
    #[serde(default)]
    pub payload_type: PayloadType,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            units: DEFAULT_UNITS.to_string(),
            payload: DEFAULT_PAYLOAD.to_string(),
            payload_type: PayloadType::default(),
        }
    }
}

/// Declared type tag of the completion payload.
///
/// Only `num` changes how the payload is interpreted; the other tags are
/// carried through to the resolved payload unchanged, except that a literal
/// `"null"` always resolves to [`PayloadType::Null`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PayloadType {
    /// Numeric payload
    #[default]
    Num,
    /// String payload
    Str,
    /// Boolean payload
    Bool,
    /// JSON payload
    Json,
    /// Null payload
    Null,
    /// Any other tag
    #[serde(other)]
    Other,
}

impl PayloadType {
    /// Returns the tag as written in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Num => "num",
            Self::Str => "str",
            Self::Bool => "bool",
            Self::Json => "json",
            Self::Null => "null",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Defaults and lenient deserializers
// ============================================================================

const fn default_duration() -> f64 {
    DEFAULT_DURATION
}

fn default_units() -> String {
    DEFAULT_UNITS.to_string()
}

fn default_payload() -> String {
    DEFAULT_PAYLOAD.to_string()
}

/// Parses a magnitude the way it is typed into a form: surrounding
/// whitespace is ignored and an empty string counts as zero.
///
/// Returns `0.0` for anything that is not a finite number.
#[must_use]
pub fn parse_magnitude(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

fn lenient_magnitude<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => parse_magnitude(&s),
        _ => 0.0,
    })
}

fn scalar_to_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    })
}
