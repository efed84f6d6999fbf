//! Countdown timer state machine
//!
//! The `TimerEngine` owns one timer: it starts or restarts a run on each
//! trigger message, cancels it on a stop message, emits progress on every
//! tick and the completion pair when the deadline fires.
//!
//! # States
//!
//! ```text
//!            trigger                      deadline
//!   Idle ─────────────────► Running ─────────────────► Idle
//!    ▲                       │  ▲ │
//!    │              trigger  └──┘ │ stop
//!    │                            ▼
//!    └──── (trigger) ──────── Stopped ◄──── stop (from any state)
//! ```
//!
//! All handlers run to completion on the caller's task. Timer events are
//! tagged with the run that armed them, so an event that was already queued
//! when its run was cancelled or replaced is recognised and dropped.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::observability::metrics;

use super::clock::{Clock, ManualClock, TimerEvent, TimerHandle};
use super::format::format_remaining;
use super::message::{Message, REMAINING_FIELD, STOPPED_PAYLOAD};
use super::output::{OutputSink, Status};
use super::resolve::TimerSettings;

/// Progress tick cadence.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Externally visible state of a [`TimerEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    /// No run in progress
    Idle,
    /// A run is counting down
    Running,
    /// The last run was cancelled by a stop message
    Stopped,
}

/// The run currently counting down.
#[derive(Debug)]
struct ActiveRun {
    id: u64,
    trigger: Message,
    end_time: Instant,
}

/// Single-timer countdown engine.
pub struct TimerEngine<C, S> {
    settings: TimerSettings,
    clock: C,
    sink: S,
    stopped: bool,
    deadline_timer: Option<TimerHandle>,
    progress_timer: Option<TimerHandle>,
    run: Option<ActiveRun>,
    next_run: u64,
}

impl<C: Clock, S: OutputSink> TimerEngine<C, S> {
    /// Creates an idle engine.
    #[must_use]
    pub const fn new(settings: TimerSettings, clock: C, sink: S) -> Self {
        Self {
            settings,
            clock,
            sink,
            stopped: false,
            deadline_timer: None,
            progress_timer: None,
            run: None,
            next_run: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn phase(&self) -> TimerPhase {
        if self.stopped {
            TimerPhase::Stopped
        } else if self.run.is_some() {
            TimerPhase::Running
        } else {
            TimerPhase::Idle
        }
    }

    /// Returns the settings the engine runs with.
    #[must_use]
    pub const fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// Returns the output sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns the output sink mutably.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Time left in the current run, if one is active.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.run
            .as_ref()
            .map(|run| run.end_time.saturating_duration_since(self.clock.now()))
    }

    /// Handles a message from the pipeline.
    ///
    /// A `"stop"`/`"STOP"` payload cancels the current run and emits a
    /// `"stopped"` notification. Any other message starts a new run,
    /// replacing the current one. A message that already passed through a
    /// timer is ignored while the engine is stopped.
    pub fn handle_input(&mut self, mut msg: Message) {
        self.sink.status(Status::Clear);

        if self.stopped && msg.timer_pass {
            debug!("ignoring re-entrant message while stopped");
            return;
        }

        self.stopped = false;
        if let Some(previous) = self.cancel_run() {
            debug!(run = previous, "cancelled in-flight run");
            if !msg.is_stop() {
                metrics::record_restart();
            }
        }

        if msg.is_stop() {
            self.stopped = true;
            self.sink.status(Status::Stopped);
            self.sink.notify(msg.with_payload(STOPPED_PAYLOAD));
            metrics::record_run_stopped();
            info!("timer stopped");
            return;
        }

        msg.timer_pass = true;

        let id = self.next_run;
        self.next_run += 1;
        let duration = self.settings.duration;
        let end_time = self.clock.now() + duration;

        self.sink.status(Status::Running {
            text: format_remaining(duration),
        });

        self.progress_timer = Some(
            self.clock
                .schedule_repeating(TICK_INTERVAL, TimerEvent::Tick { run: id }),
        );
        self.deadline_timer = Some(
            self.clock
                .schedule_once(duration, TimerEvent::Deadline { run: id }),
        );
        self.run = Some(ActiveRun {
            id,
            trigger: msg,
            end_time,
        });

        metrics::record_run_started();
        info!(
            run = id,
            duration = %humantime::format_duration(duration),
            "timer started"
        );
    }

    /// Handles an event from a scheduled timer.
    ///
    /// Events that do not belong to the active run are dropped.
    pub fn handle_timer(&mut self, event: TimerEvent) {
        match &self.run {
            Some(run) if run.id == event.run() => {}
            _ => {
                trace!(run = event.run(), "dropping stale timer event");
                return;
            }
        }

        match event {
            TimerEvent::Tick { .. } => self.tick(),
            TimerEvent::Deadline { .. } => self.expire(),
        }
    }

    /// Cancels any run and clears the status. Nothing is emitted afterwards
    /// unless a new message arrives.
    pub fn shutdown(&mut self) {
        if let Some(run) = self.cancel_run() {
            debug!(run, "cancelled in-flight run on shutdown");
        }
        self.stopped = false;
        self.sink.status(Status::Clear);
        debug!("timer engine shut down");
    }

    fn tick(&mut self) {
        let Some(run) = &self.run else {
            return;
        };

        let now = self.clock.now();
        let remaining = run.end_time.saturating_duration_since(now);
        let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);

        if remaining_ms == 0 {
            // The deadline owns expiry. Only step in if it is a full tick late.
            if now.saturating_duration_since(run.end_time) >= TICK_INTERVAL {
                warn!(run = run.id, "deadline overdue, expiring from progress tick");
                self.expire();
            }
            return;
        }

        let text = format_remaining(remaining);
        let progress = run
            .trigger
            .with_payload(remaining_ms)
            .with_field(REMAINING_FIELD, text.clone());
        trace!(run = run.id, remaining_ms, "progress tick");

        self.sink.status(Status::Running { text });
        self.sink.progress(progress);
        metrics::record_progress_tick();
    }

    fn expire(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        self.cancel_timers();
        self.sink.status(Status::Clear);
        metrics::set_run_active(false);

        if self.stopped {
            return;
        }

        let completion = run
            .trigger
            .with_payload(self.settings.completion.value.clone());
        self.sink.pass_through(run.trigger);
        self.sink.notify(completion);

        metrics::record_run_completed();
        info!(run = run.id, "timer completed");
    }

    /// Cancels the active run's timers and forgets the run.
    ///
    /// Returns the id of the run that was active, if any.
    fn cancel_run(&mut self) -> Option<u64> {
        self.cancel_timers();
        let run = self.run.take()?;
        metrics::set_run_active(false);
        Some(run.id)
    }

    fn cancel_timers(&mut self) {
        if let Some(handle) = self.progress_timer.take() {
            self.clock.cancel(handle);
        }
        if let Some(handle) = self.deadline_timer.take() {
            self.clock.cancel(handle);
        }
    }
}

impl<S: OutputSink> TimerEngine<ManualClock, S> {
    /// Moves virtual time forward by `by`, handling every timer event that
    /// falls due on the way.
    pub fn advance(&mut self, by: Duration) {
        let target = self.clock.elapsed() + by;
        while let Some(event) = self.clock.next_due(target) {
            self.handle_timer(event);
        }
        self.clock.set_elapsed(target);
    }
}

impl<C, S> std::fmt::Debug for TimerEngine<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("settings", &self.settings)
            .field("stopped", &self.stopped)
            .field("run", &self.run.as_ref().map(|r| r.id))
            .finish_non_exhaustive()
    }
}
