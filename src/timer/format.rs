//! Remaining-time formatting

use std::time::Duration;

/// Formats a remaining duration as `HH:MM:SS`.
///
/// Seconds are rounded up so a run that is still in progress never reads
/// `00:00:00`. Hours are unbounded; every field is at least two digits.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_millis().div_ceil(1_000);
    let secs = total % 60;
    let mins = (total / 60) % 60;
    let hours = total / 3_600;
    format!("{hours:02}:{mins:02}:{secs:02}")
}
