//! `resolve` command
//!
//! Prints the settings a timer would run with, after defaults, file and
//! flag overrides and normalization.

use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::error::StopTimerError;
use crate::timer::TimerSettings;

/// Print the resolved timer settings.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded.
pub fn run(args: &ResolveArgs) -> Result<(), StopTimerError> {
    let config = super::load_config(&args.timer)?;
    let settings = TimerSettings::from_config(&config);
    println!("{}", render(&settings, args.format)?);
    Ok(())
}

fn render(settings: &TimerSettings, format: OutputFormat) -> Result<String, StopTimerError> {
    match format {
        OutputFormat::Human => Ok(format!(
            "duration: {} ({} ms)\ncompletion: {} ({})",
            humantime::format_duration(settings.duration),
            settings.duration.as_millis(),
            settings.completion.value,
            settings.completion.payload_type,
        )),
        OutputFormat::Json => Ok(serde_json::to_string(settings)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{PayloadType, TimerConfig};

    fn settings(duration: f64, units: &str, payload: &str, ty: PayloadType) -> TimerSettings {
        TimerSettings::from_config(&TimerConfig {
            duration,
            units: units.to_string(),
            payload: payload.to_string(),
            payload_type: ty,
        })
    }

    #[test]
    fn human_output() {
        let out = render(&TimerSettings::default(), OutputFormat::Human).unwrap();
        assert_eq!(out, "duration: 5s (5000 ms)\ncompletion: 0 (num)");
    }

    #[test]
    fn json_output() {
        let s = settings(1.5, "Minute", "done", PayloadType::Str);
        let out = render(&s, OutputFormat::Json).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["duration_ms"], 90_000);
        assert_eq!(v["completion"]["value"], "done");
    }
}
