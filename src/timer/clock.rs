//! Clock and timer scheduling
//!
//! The engine never sleeps or spawns on its own. It asks a [`Clock`] for the
//! current time and to schedule [`TimerEvent`]s, which are later handed back
//! to [`TimerEngine::handle_timer`](super::TimerEngine::handle_timer).
//!
//! - [`TokioClock`] spawns a tokio task per timer and delivers events over an
//!   mpsc channel; it is what [`TimerNode`](super::TimerNode) uses.
//! - [`ManualClock`] is a virtual clock for deterministic tests: time only
//!   moves when the caller pops due events.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Longest single sleep a [`TokioClock`] timer performs before re-checking
/// its deadline.
const MAX_SLEEP: Duration = Duration::from_secs(24 * 3600);

/// Smallest repeat interval either clock accepts.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// An event produced by a scheduled timer.
///
/// `run` identifies the run that armed the timer; events from runs that are
/// no longer active are dropped by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Periodic progress tick
    Tick {
        /// Run that armed the timer
        run: u64,
    },
    /// Run deadline
    Deadline {
        /// Run that armed the timer
        run: u64,
    },
}

impl TimerEvent {
    /// Returns the run this event belongs to.
    #[must_use]
    pub const fn run(&self) -> u64 {
        match self {
            Self::Tick { run } | Self::Deadline { run } => *run,
        }
    }
}

/// Opaque handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Time source and timer scheduler used by the engine.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Schedules `event` once, after `delay`.
    fn schedule_once(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle;

    /// Schedules `event` every `interval`, first after one interval.
    fn schedule_repeating(&mut self, interval: Duration, event: TimerEvent) -> TimerHandle;

    /// Cancels a timer. Unknown or already-finished handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

// ============================================================================
// Tokio clock
// ============================================================================

/// [`Clock`] backed by tokio tasks.
///
/// Must be used from within a tokio runtime. Dropping the clock aborts every
/// timer it still owns.
#[derive(Debug)]
pub struct TokioClock {
    events: mpsc::UnboundedSender<TimerEvent>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    next_handle: u64,
}

impl TokioClock {
    /// Creates a clock and the receiver its timer events arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                tasks: HashMap::new(),
                next_handle: 0,
            },
            rx,
        )
    }

    /// Number of timers currently owned by the clock.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|t| !t.is_finished()).count()
    }

    fn register(&mut self, task: JoinHandle<()>) -> TimerHandle {
        self.tasks.retain(|_, t| !t.is_finished());
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.insert(handle, task);
        handle
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn schedule_once(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let deadline = Instant::now() + delay;
        let tx = self.events.clone();
        let task = tokio::spawn(async move {
            loop {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                tokio::time::sleep((deadline - now).min(MAX_SLEEP)).await;
            }
            let _ = tx.send(event);
        });
        self.register(task)
    }

    fn schedule_repeating(&mut self, interval: Duration, event: TimerEvent) -> TimerHandle {
        let interval = interval.max(MIN_INTERVAL);
        let start = Instant::now() + interval;
        let tx = self.events.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(event).is_err() {
                    break;
                }
            }
        });
        self.register(task)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

// ============================================================================
// Manual clock
// ============================================================================

/// Deterministic virtual [`Clock`].
///
/// Clones share state, so a test can keep one handle to drive time while the
/// engine owns another. Due events come out in due-time order; events due at
/// the same instant come out in the order they were scheduled.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    origin: Instant,
    elapsed: Duration,
    next_handle: u64,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), Scheduled>,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    handle: TimerHandle,
    event: TimerEvent,
    repeat: Option<Duration>,
}

impl ManualState {
    fn insert(&mut self, due: Duration, scheduled: Scheduled) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert((due, seq), scheduled);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock at virtual time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                next_handle: 0,
                next_seq: 0,
                pending: BTreeMap::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Virtual time elapsed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state().elapsed
    }

    /// Number of scheduled timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state().pending.len()
    }

    /// Pops the earliest event due at or before `until` (virtual time since
    /// creation), moving the clock to that event's due time.
    ///
    /// Repeating timers are rescheduled one interval later.
    pub fn next_due(&self, until: Duration) -> Option<TimerEvent> {
        let mut state = self.state();
        let (&(due, seq), _) = state.pending.first_key_value()?;
        if due > until {
            return None;
        }
        let scheduled = state.pending.remove(&(due, seq))?;
        state.elapsed = state.elapsed.max(due);
        if let Some(interval) = scheduled.repeat {
            state.insert(due + interval, scheduled);
        }
        Some(scheduled.event)
    }

    /// Moves virtual time forward without firing anything.
    ///
    /// Callers normally drain [`next_due`](Self::next_due) first.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut state = self.state();
        state.elapsed = state.elapsed.max(elapsed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let state = self.state();
        state.origin + state.elapsed
    }

    fn schedule_once(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let mut state = self.state();
        let handle = TimerHandle(state.next_handle);
        state.next_handle += 1;
        let due = state.elapsed + delay;
        state.insert(
            due,
            Scheduled {
                handle,
                event,
                repeat: None,
            },
        );
        handle
    }

    fn schedule_repeating(&mut self, interval: Duration, event: TimerEvent) -> TimerHandle {
        let interval = interval.max(MIN_INTERVAL);
        let mut state = self.state();
        let handle = TimerHandle(state.next_handle);
        state.next_handle += 1;
        let due = state.elapsed + interval;
        state.insert(
            due,
            Scheduled {
                handle,
                event,
                repeat: Some(interval),
            },
        );
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.state().pending.retain(|_, s| s.handle != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_manual_clock_usable_after_panic_while_locked() {
        let clock = ManualClock::new();
        let holder = clock.clone();
        let result = std::thread::spawn(move || {
            let _guard = holder.state();
            panic!("panic while holding the clock lock");
        })
        .join();
        assert!(result.is_err());

        clock.set_elapsed(ms(5));
        assert_eq!(clock.elapsed(), ms(5));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_manual_once() {
        let mut clock = ManualClock::new();
        clock.schedule_once(ms(500), TimerEvent::Deadline { run: 1 });

        assert_eq!(clock.next_due(ms(499)), None);
        assert_eq!(
            clock.next_due(ms(500)),
            Some(TimerEvent::Deadline { run: 1 })
        );
        assert_eq!(clock.elapsed(), ms(500));
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_manual_repeating_reschedules() {
        let mut clock = ManualClock::new();
        clock.schedule_repeating(ms(1000), TimerEvent::Tick { run: 0 });

        let mut fired = 0;
        while clock.next_due(ms(3500)).is_some() {
            fired += 1;
        }
        assert_eq!(fired, 3);
        assert_eq!(clock.elapsed(), ms(3000));
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_manual_same_instant_keeps_schedule_order() {
        let mut clock = ManualClock::new();
        clock.schedule_once(ms(100), TimerEvent::Tick { run: 7 });
        clock.schedule_once(ms(100), TimerEvent::Deadline { run: 7 });

        assert_eq!(clock.next_due(ms(100)), Some(TimerEvent::Tick { run: 7 }));
        assert_eq!(
            clock.next_due(ms(100)),
            Some(TimerEvent::Deadline { run: 7 })
        );
    }

    #[test]
    fn test_manual_cancel() {
        let mut clock = ManualClock::new();
        let tick = clock.schedule_repeating(ms(1000), TimerEvent::Tick { run: 0 });
        clock.schedule_once(ms(2000), TimerEvent::Deadline { run: 0 });
        clock.cancel(tick);
        clock.cancel(tick);

        assert_eq!(
            clock.next_due(ms(5000)),
            Some(TimerEvent::Deadline { run: 0 })
        );
        assert_eq!(clock.next_due(ms(5000)), None);
    }

    #[test]
    fn test_manual_now_tracks_elapsed() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.set_elapsed(ms(1500));
        assert_eq!(clock.now() - start, ms(1500));
        clock.set_elapsed(ms(10));
        assert_eq!(clock.elapsed(), ms(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_once() {
        let (mut clock, mut rx) = TokioClock::new();
        let start = Instant::now();
        clock.schedule_once(ms(1500), TimerEvent::Deadline { run: 3 });

        let event = rx.recv().await.unwrap();
        assert_eq!(event, TimerEvent::Deadline { run: 3 });
        assert!(start.elapsed() >= ms(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_repeating_and_cancel() {
        let (mut clock, mut rx) = TokioClock::new();
        let handle = clock.schedule_repeating(ms(1000), TimerEvent::Tick { run: 1 });

        assert_eq!(rx.recv().await, Some(TimerEvent::Tick { run: 1 }));
        assert_eq!(rx.recv().await, Some(TimerEvent::Tick { run: 1 }));
        assert_eq!(clock.pending(), 1);

        clock.cancel(handle);
        tokio::time::sleep(ms(5000)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(clock.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_drop_aborts_timers() {
        let (mut clock, mut rx) = TokioClock::new();
        clock.schedule_once(ms(100), TimerEvent::Deadline { run: 0 });
        drop(clock);
        assert_eq!(rx.recv().await, None);
    }
}
