//! Metrics collection for `stoptimer`.
//!
//! Prometheus-compatible counters for the run lifecycle. Recording is a
//! no-op until [`init_metrics`] installs a recorder.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::StopTimerError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `StopTimerError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), StopTimerError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| StopTimerError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "stoptimer_runs_started_total",
        "Total number of timer runs started"
    );
    describe_counter!(
        "stoptimer_runs_completed_total",
        "Total number of timer runs that reached their deadline"
    );
    describe_counter!(
        "stoptimer_runs_stopped_total",
        "Total number of stop messages handled"
    );
    describe_counter!(
        "stoptimer_restarts_total",
        "Total number of runs replaced by a new trigger"
    );
    describe_counter!(
        "stoptimer_progress_ticks_total",
        "Total number of progress messages emitted"
    );
    describe_gauge!("stoptimer_run_active", "Whether a run is counting down (1 = active)");
}

/// Records a run start and marks the run active.
pub fn record_run_started() {
    counter!("stoptimer_runs_started_total").increment(1);
    set_run_active(true);
}

/// Records a run reaching its deadline.
pub fn record_run_completed() {
    counter!("stoptimer_runs_completed_total").increment(1);
}

/// Records a stop message.
pub fn record_run_stopped() {
    counter!("stoptimer_runs_stopped_total").increment(1);
}

/// Records a run replaced by a new trigger.
pub fn record_restart() {
    counter!("stoptimer_restarts_total").increment(1);
}

/// Records one progress message.
pub fn record_progress_tick() {
    counter!("stoptimer_progress_ticks_total").increment(1);
}

/// Sets the active-run gauge.
pub fn set_run_active(active: bool) {
    gauge!("stoptimer_run_active").set(if active { 1.0 } else { 0.0 });
}
