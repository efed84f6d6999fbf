//! Duration and completion payload resolution
//!
//! Both resolvers are pure and run once, when a node is built. They never
//! fail: unusable input collapses to a zero duration or a plain string.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::config::schema::{PayloadType, TimerConfig};

/// Longest duration a run may last.
///
/// Keeps `Instant + duration` from overflowing for absurd magnitudes.
pub const MAX_DURATION: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Recognized duration units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    /// Seconds
    Second,
    /// Minutes
    Minute,
    /// Hours
    Hour,
}

impl DurationUnit {
    /// Looks up a unit by its configured name (case-sensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Second" => Some(Self::Second),
            "Minute" => Some(Self::Minute),
            "Hour" => Some(Self::Hour),
            _ => None,
        }
    }

    /// Milliseconds per unit.
    #[must_use]
    pub const fn millis(self) -> f64 {
        match self {
            Self::Second => 1_000.0,
            Self::Minute => 60_000.0,
            Self::Hour => 3_600_000.0,
        }
    }
}

/// Converts a magnitude and optional unit into a run duration.
///
/// Non-positive and NaN magnitudes give [`Duration::ZERO`]. Without a unit
/// the magnitude is taken as milliseconds.
#[must_use]
pub fn resolve_duration(magnitude: f64, unit: Option<DurationUnit>) -> Duration {
    if magnitude.is_nan() || magnitude <= 0.0 {
        return Duration::ZERO;
    }
    let millis = (magnitude * unit.map_or(1.0, DurationUnit::millis)).round();
    #[allow(clippy::cast_precision_loss)]
    let ceiling = MAX_DURATION.as_millis() as f64;
    if millis >= ceiling {
        return MAX_DURATION;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = millis as u64;
    Duration::from_millis(millis)
}

/// Completion payload after type resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionPayload {
    /// Value placed in the notification on natural expiry
    pub value: Value,
    /// Effective type tag
    pub payload_type: PayloadType,
}

/// Resolves the configured completion payload into a typed value.
///
/// First match wins:
/// 1. declared `num` and `raw` is a finite number → number
/// 2. `raw` is exactly `"true"` or `"false"` → boolean
/// 3. `raw` is exactly `"null"` → null, type forced to `null`
/// 4. anything else → the raw string
#[must_use]
pub fn resolve_payload(raw: &str, declared: PayloadType) -> CompletionPayload {
    if declared == PayloadType::Num {
        if let Some(number) = parse_number(raw) {
            return CompletionPayload {
                value: Value::Number(number),
                payload_type: PayloadType::Num,
            };
        }
    }

    match raw {
        "true" | "false" => CompletionPayload {
            value: Value::Bool(raw == "true"),
            payload_type: declared,
        },
        "null" => CompletionPayload {
            value: Value::Null,
            payload_type: PayloadType::Null,
        },
        _ => CompletionPayload {
            value: Value::String(raw.to_string()),
            payload_type: declared,
        },
    }
}

/// Parses a numeric payload, preferring an integer representation.
///
/// Surrounding whitespace is ignored and a blank string is zero.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn parse_number(raw: &str) -> Option<serde_json::Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.into());
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(int.into());
    }
    let float = trimmed.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if float.fract() == 0.0 && float.abs() < 9_007_199_254_740_992.0 {
        return Some((float as i64).into());
    }
    serde_json::Number::from_f64(float)
}

/// Settings a [`TimerEngine`](super::TimerEngine) runs with, resolved once
/// from a [`TimerConfig`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSettings {
    /// Run duration
    #[serde(serialize_with = "serialize_millis", rename = "duration_ms")]
    pub duration: Duration,
    /// Completion payload
    pub completion: CompletionPayload,
}

impl TimerSettings {
    /// Resolves the configuration into engine settings.
    #[must_use]
    pub fn from_config(config: &TimerConfig) -> Self {
        let unit = DurationUnit::from_name(&config.units);
        if unit.is_none() {
            tracing::debug!(units = %config.units, "unrecognized unit, duration taken as milliseconds");
        }
        Self {
            duration: resolve_duration(config.duration, unit),
            completion: resolve_payload(&config.payload, config.payload_type),
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from_config(&TimerConfig::default())
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
