//! `run` command
//!
//! Spawns a timer node, feeds it one message per stdin line and writes every
//! output as a JSONL event on stdout.

use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::args::RunArgs;
use crate::error::StopTimerError;
use crate::observability::events::{EmitterSink, Event, EventEmitter};
use crate::timer::{Message, TimerNode, TimerSettings};

/// Run a timer node over stdin/stdout until EOF or cancellation.
///
/// # Errors
///
/// Returns a config error if the configuration cannot be loaded, or an I/O
/// error if stdin cannot be read.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), StopTimerError> {
    if let Some(port) = args.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    let config = super::load_config(&args.timer)?;
    let settings = TimerSettings::from_config(&config);
    let emitter = Arc::new(EventEmitter::stdout());

    let stdin = BufReader::new(tokio::io::stdin());
    serve(settings, stdin, emitter, cancel).await
}

/// Drives a node from `input` until EOF or cancellation.
///
/// At EOF the node finishes any run in progress before it stops.
///
/// # Errors
///
/// Returns an I/O error if reading `input` fails.
pub async fn serve<R>(
    settings: TimerSettings,
    input: R,
    emitter: Arc<EventEmitter>,
    cancel: CancellationToken,
) -> Result<(), StopTimerError>
where
    R: AsyncBufRead + Unpin,
{
    emitter.emit(Event::NodeStarted {
        timestamp: Utc::now(),
        settings: settings.clone(),
    });
    info!(
        duration = %humantime::format_duration(settings.duration),
        "timer node ready"
    );

    let node = TimerNode::spawn_with_cancel(
        settings,
        EmitterSink::new(Arc::clone(&emitter)),
        cancel.child_token(),
    );
    let mut lines = input.lines();

    let read = loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break Ok("interrupted"),
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break Ok("EOF"),
            Err(e) => break Err(e),
        };
        let Some(msg) = Message::from_line(&line) else {
            debug!("skipping blank input line");
            continue;
        };
        if let Err(e) = node.send(msg) {
            debug!(error = %e, "timer node no longer accepting input");
            break Ok("node closed");
        }
    };

    // At EOF the last run still counts down; a cancel cuts it short.
    if cancel.is_cancelled() {
        node.shutdown().await?;
    } else {
        node.close().await?;
    }

    emitter.emit(Event::NodeStopped {
        timestamp: Utc::now(),
        reason: match &read {
            Ok(_) if cancel.is_cancelled() => "interrupted".to_string(),
            Ok(reason) => (*reason).to_string(),
            Err(e) => format!("error: {e}"),
        },
    });

    read?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone)]
    struct TestWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn events(buf: &Arc<Mutex<Vec<u8>>>) -> Vec<serde_json::Value> {
        let buf = buf.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn of_type<'a>(events: &'a [serde_json::Value], kind: &str) -> Vec<&'a serde_json::Value> {
        events.iter().filter(|e| e["type"] == kind).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn eof_shuts_node_down() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let emitter = Arc::new(EventEmitter::new(Box::new(TestWriter(Arc::clone(&buf)))));

        let input: &[u8] = b"\n{\"payload\":\"stop\"}\n";
        serve(
            TimerSettings::default(),
            input,
            emitter,
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let events = events(&buf);
        let kinds: Vec<_> = events.iter().map(|e| e["type"].clone()).collect();
        assert_eq!(kinds.first().unwrap(), "NodeStarted");
        assert_eq!(kinds.last().unwrap(), "NodeStopped");
        assert_eq!(events.last().unwrap()["reason"], "EOF");

        let notes: Vec<_> = events
            .iter()
            .filter(|e| e["type"] == "Notification")
            .collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["message"]["payload"], "stopped");
    }

    #[tokio::test(start_paused = true)]
    async fn eof_waits_for_active_run() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let emitter = Arc::new(EventEmitter::new(Box::new(TestWriter(Arc::clone(&buf)))));
        let settings = TimerSettings {
            duration: std::time::Duration::from_secs(3),
            ..TimerSettings::default()
        };

        let input: &[u8] = b"go\n";
        serve(settings, input, emitter, CancellationToken::new())
            .await
            .unwrap();

        let events = events(&buf);

        let progress = of_type(&events, "Progress");
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0]["message"]["payload"], 2000);
        assert_eq!(progress[1]["message"]["remaining"], "00:00:01");

        let passed = of_type(&events, "PassThrough");
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0]["message"]["payload"], "go");

        let notes = of_type(&events, "Notification");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["message"]["payload"], 0);

        assert_eq!(events.last().unwrap()["type"], "NodeStopped");
        assert_eq!(events.last().unwrap()["reason"], "EOF");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_read() {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let emitter = Arc::new(EventEmitter::new(Box::new(TestWriter(Arc::clone(&buf)))));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (_tx, rx) = tokio::io::duplex(64);
        serve(TimerSettings::default(), BufReader::new(rx), emitter, cancel)
            .await
            .unwrap();

        let events = events(&buf);
        assert_eq!(events.last().unwrap()["reason"], "interrupted");
    }
}
