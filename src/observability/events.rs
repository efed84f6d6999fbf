//! Structured event stream for `stoptimer`.
//!
//! Everything a timer node emits in the CLI host is written as one JSON
//! line per event, with a monotonically increasing sequence number for
//! ordering guarantees.

use std::io::{BufWriter, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::timer::{Message, OutputSink, Status, TimerSettings};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted by the CLI host.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The timer node is ready for input.
    NodeStarted {
        /// When the node started.
        timestamp: DateTime<Utc>,
        /// Resolved settings.
        settings: TimerSettings,
    },

    /// The timer node has shut down.
    NodeStopped {
        /// When the node stopped.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
    },

    /// A run completed; the original trigger is passed through.
    PassThrough {
        /// When the message was emitted.
        timestamp: DateTime<Utc>,
        /// The trigger message.
        message: Message,
    },

    /// A run was stopped or completed.
    Notification {
        /// When the message was emitted.
        timestamp: DateTime<Utc>,
        /// `"stopped"` or the completion payload.
        message: Message,
    },

    /// Remaining time of the active run.
    Progress {
        /// When the message was emitted.
        timestamp: DateTime<Utc>,
        /// Trigger clone carrying the remaining time.
        message: Message,
    },

    /// The node status changed.
    Status {
        /// When the status changed.
        timestamp: DateTime<Utc>,
        /// New status.
        status: Status,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) atomically increments the sequence
/// counter, serializes the event as a single JSON line, and flushes the
/// underlying writer. Serialization or I/O failures are dropped; a closed
/// stdout must not take the timer down.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug.
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// [`OutputSink`] that writes every output as an [`Event`].
#[derive(Debug, Clone)]
pub struct EmitterSink {
    emitter: Arc<EventEmitter>,
}

impl EmitterSink {
    /// Wraps a shared emitter.
    #[must_use]
    pub const fn new(emitter: Arc<EventEmitter>) -> Self {
        Self { emitter }
    }
}

impl OutputSink for EmitterSink {
    fn pass_through(&mut self, message: Message) {
        self.emitter.emit(Event::PassThrough {
            timestamp: Utc::now(),
            message,
        });
    }

    fn notify(&mut self, message: Message) {
        self.emitter.emit(Event::Notification {
            timestamp: Utc::now(),
            message,
        });
    }

    fn progress(&mut self, message: Message) {
        self.emitter.emit(Event::Progress {
            timestamp: Utc::now(),
            message,
        });
    }

    fn status(&mut self, status: Status) {
        self.emitter.emit(Event::Status {
            timestamp: Utc::now(),
            status,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn lines(&self) -> Vec<serde_json::Value> {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn emitter_writes_sequenced_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(Event::NodeStarted {
            timestamp: Utc::now(),
            settings: TimerSettings::default(),
        });
        emitter.emit(Event::NodeStopped {
            timestamp: Utc::now(),
            reason: "eof".to_owned(),
        });
        assert_eq!(emitter.event_count(), 2);

        let lines = tw.lines();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[0]["type"], "NodeStarted");
        assert_eq!(lines[0]["settings"]["duration_ms"], 5000);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["reason"], "eof");
    }

    #[test]
    fn sink_tags_each_port() {
        let tw = TestWriter::new();
        let mut sink = EmitterSink::new(Arc::new(EventEmitter::new(Box::new(tw.clone()))));

        sink.progress(Message::new(2000).with_field("remaining", "00:00:02"));
        sink.pass_through(Message::new("go"));
        sink.notify(Message::new(0));
        sink.status(Status::Stopped);

        let lines = tw.lines();
        assert_eq!(lines[0]["type"], "Progress");
        assert_eq!(lines[0]["message"]["payload"], 2000);
        assert_eq!(lines[0]["message"]["remaining"], "00:00:02");
        assert_eq!(lines[1]["type"], "PassThrough");
        assert_eq!(lines[2]["type"], "Notification");
        assert_eq!(lines[3]["type"], "Status");
        assert_eq!(lines[3]["status"]["state"], "stopped");
        assert_eq!(lines[3]["status"]["text"], "stopped");
    }

    #[test]
    fn noop_emitter_counts() {
        let emitter = EventEmitter::noop();
        emitter.emit(Event::NodeStopped {
            timestamp: Utc::now(),
            reason: "test".to_owned(),
        });
        assert_eq!(emitter.event_count(), 1);
    }
}
