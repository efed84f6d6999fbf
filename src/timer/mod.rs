//! Countdown timer
//!
//! A timer node starts a countdown when a message arrives, reports the time
//! left once a second, and on expiry forwards the original message and a
//! configurable completion value. A `"stop"` message cancels the countdown.
//!
//! [`TimerEngine`] holds the state machine and is driven by a [`Clock`];
//! [`TimerNode`] runs one on a tokio task with real timers.

pub mod clock;
pub mod engine;
pub mod format;
pub mod message;
pub mod node;
pub mod output;
pub mod resolve;

pub use clock::{Clock, ManualClock, TimerEvent, TimerHandle, TokioClock};
pub use engine::{TICK_INTERVAL, TimerEngine, TimerPhase};
pub use format::format_remaining;
pub use message::Message;
pub use node::TimerNode;
pub use output::{ChannelOutputs, Output, OutputReceivers, OutputSink, RecordingSink, Status};
pub use resolve::{
    CompletionPayload, DurationUnit, MAX_DURATION, TimerSettings, resolve_duration,
    resolve_payload,
};
