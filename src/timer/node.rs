//! Tokio host for a [`TimerEngine`]
//!
//! A `TimerNode` owns one engine on a dedicated task. Inbound messages and
//! timer events are funnelled through the same `select!` loop, so the engine
//! is never touched concurrently.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::NodeError;

use super::clock::{TimerEvent, TokioClock};
use super::engine::{TimerEngine, TimerPhase};
use super::message::Message;
use super::output::OutputSink;
use super::resolve::TimerSettings;

/// Handle to a running timer node.
///
/// Dropping the handle closes the inbox: the engine finishes any run in
/// progress and then shuts down.
#[derive(Debug)]
pub struct TimerNode {
    inbox: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TimerNode {
    /// Spawns the node task.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<S>(settings: TimerSettings, sink: S) -> Self
    where
        S: OutputSink + Send + 'static,
    {
        Self::spawn_with_cancel(settings, sink, CancellationToken::new())
    }

    /// Spawns the node task, shutting it down immediately once `cancel`
    /// fires.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_with_cancel<S>(settings: TimerSettings, sink: S, cancel: CancellationToken) -> Self
    where
        S: OutputSink + Send + 'static,
    {
        let (clock, events) = TokioClock::new();
        let engine = TimerEngine::new(settings, clock, sink);
        let (inbox, messages) = mpsc::unbounded_channel();

        let task = tokio::spawn(node_loop(engine, messages, events, cancel.clone()));
        Self {
            inbox,
            cancel,
            task,
        }
    }

    /// Delivers a message to the engine.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Closed` if the node has stopped.
    pub fn send(&self, msg: Message) -> Result<(), NodeError> {
        self.inbox.send(msg).map_err(|_| NodeError::Closed)
    }

    /// Returns `true` once the node task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Shuts the engine down immediately and waits for the task to exit.
    /// Messages still queued are discarded and an active run is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Join` if the node task panicked.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| NodeError::Join(e.to_string()))
    }

    /// Closes the inbox and waits for the task to exit.
    ///
    /// The engine handles every queued message and lets the last run count
    /// down to completion before shutting down. Cancelling the node's token
    /// still stops it immediately.
    ///
    /// # Errors
    ///
    /// Returns `NodeError::Join` if the node task panicked.
    pub async fn close(self) -> Result<(), NodeError> {
        let Self { inbox, task, .. } = self;
        drop(inbox);
        task.await.map_err(|e| NodeError::Join(e.to_string()))
    }
}

async fn node_loop<S: OutputSink>(
    mut engine: TimerEngine<TokioClock, S>,
    mut messages: mpsc::UnboundedReceiver<Message>,
    mut events: mpsc::UnboundedReceiver<TimerEvent>,
    cancel: CancellationToken,
) {
    debug!(settings = ?engine.settings(), "timer node started");
    let mut inbox_open = true;

    loop {
        if !inbox_open && engine.phase() != TimerPhase::Running {
            break;
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("timer node cancelled");
                break;
            }
            Some(event) = events.recv() => engine.handle_timer(event),
            msg = messages.recv(), if inbox_open => {
                if let Some(msg) = msg {
                    engine.handle_input(msg);
                } else {
                    debug!("timer node inbox closed, draining active run");
                    inbox_open = false;
                }
            }
        }
    }

    engine.shutdown();
    info!("timer node stopped");
}
