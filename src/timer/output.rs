//! Output ports and status side channel
//!
//! The engine writes to three named ports and one status channel through
//! the [`OutputSink`] trait. [`ChannelOutputs`] backs them with tokio
//! channels for hosts that consume outputs asynchronously.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tokio::sync::{mpsc, watch};

use super::message::{Message, STOPPED_PAYLOAD};

/// Node status shown alongside the outputs.
///
/// Serializes as `{"state": ..., "text": ...}`; `text` is omitted when the
/// status is clear.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    /// No status
    #[default]
    Clear,
    /// A run is active; `text` is the remaining time as `HH:MM:SS`
    Running {
        /// Remaining time
        text: String,
    },
    /// The last run was cancelled
    Stopped,
}

impl Status {
    /// Returns the state tag.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Running { .. } => "running",
            Self::Stopped => "stopped",
        }
    }

    /// Returns the status text, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Clear => None,
            Self::Running { text } => Some(text),
            Self::Stopped => Some(STOPPED_PAYLOAD),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.text();
        let mut state = serializer.serialize_struct("Status", 1 + usize::from(text.is_some()))?;
        state.serialize_field("state", self.state())?;
        if let Some(text) = text {
            state.serialize_field("text", text)?;
        }
        state.end()
    }
}

/// Destination for everything a [`TimerEngine`](super::TimerEngine) emits.
pub trait OutputSink {
    /// The original trigger, once per completed run.
    fn pass_through(&mut self, msg: Message);

    /// `"stopped"` on cancel, or the completion payload on expiry.
    fn notify(&mut self, msg: Message);

    /// Remaining time while a run is active.
    fn progress(&mut self, msg: Message);

    /// Status side channel.
    fn status(&mut self, status: Status);
}

/// [`OutputSink`] backed by tokio channels.
///
/// Sends to dropped receivers are ignored.
#[derive(Debug)]
pub struct ChannelOutputs {
    pass_through: mpsc::UnboundedSender<Message>,
    notification: mpsc::UnboundedSender<Message>,
    progress: mpsc::UnboundedSender<Message>,
    status: watch::Sender<Status>,
}

/// Receiving ends of [`ChannelOutputs`].
#[derive(Debug)]
pub struct OutputReceivers {
    /// Pass-through port
    pub pass_through: mpsc::UnboundedReceiver<Message>,
    /// Notification port
    pub notification: mpsc::UnboundedReceiver<Message>,
    /// Progress port
    pub progress: mpsc::UnboundedReceiver<Message>,
    /// Latest status
    pub status: watch::Receiver<Status>,
}

impl ChannelOutputs {
    /// Creates the sink and its receivers.
    #[must_use]
    pub fn new() -> (Self, OutputReceivers) {
        let (pass_through_tx, pass_through_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(Status::Clear);

        (
            Self {
                pass_through: pass_through_tx,
                notification: notification_tx,
                progress: progress_tx,
                status: status_tx,
            },
            OutputReceivers {
                pass_through: pass_through_rx,
                notification: notification_rx,
                progress: progress_rx,
                status: status_rx,
            },
        )
    }
}

impl OutputSink for ChannelOutputs {
    fn pass_through(&mut self, msg: Message) {
        let _ = self.pass_through.send(msg);
    }

    fn notify(&mut self, msg: Message) {
        let _ = self.notification.send(msg);
    }

    fn progress(&mut self, msg: Message) {
        let _ = self.progress.send(msg);
    }

    fn status(&mut self, status: Status) {
        self.status.send_replace(status);
    }
}

/// Everything a sink received, in order. Used by tests and by hosts that
/// collect outputs synchronously.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "port", rename_all = "snake_case")]
pub enum Output {
    /// Pass-through port
    PassThrough {
        /// Emitted message
        message: Message,
    },
    /// Notification port
    Notification {
        /// Emitted message
        message: Message,
    },
    /// Progress port
    Progress {
        /// Emitted message
        message: Message,
    },
    /// Status side channel
    Status {
        /// New status
        status: Status,
    },
}

/// [`OutputSink`] that records outputs in a `Vec`.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Recorded outputs, oldest first
    pub outputs: Vec<Output>,
}

impl RecordingSink {
    /// Removes and returns everything recorded so far.
    pub fn drain(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.outputs)
    }
}

impl OutputSink for RecordingSink {
    fn pass_through(&mut self, message: Message) {
        self.outputs.push(Output::PassThrough { message });
    }

    fn notify(&mut self, message: Message) {
        self.outputs.push(Output::Notification { message });
    }

    fn progress(&mut self, message: Message) {
        self.outputs.push(Output::Progress { message });
    }

    fn status(&mut self, status: Status) {
        self.outputs.push(Output::Status { status });
    }
}
