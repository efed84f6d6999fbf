//! Shared integration-test harness for spawning `stoptimer run` as a child
//! process and exchanging JSONL over stdio.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

/// Default timeout for reading a single event.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running `stoptimer run` process.
///
/// The child process is killed on drop via `kill_on_drop(true)`.
#[allow(clippy::missing_panics_doc)]
pub struct StopTimerProcess {
    child: Child,
    stdin: Option<tokio::process::ChildStdin>,
    reader: BufReader<tokio::process::ChildStdout>,
}

impl StopTimerProcess {
    /// Spawns `stoptimer run` with extra arguments.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn(args: &[&str]) -> Self {
        let bin = env!("CARGO_BIN_EXE_stoptimer");
        let mut child = Command::new(bin)
            .arg("run")
            .args(args)
            .arg("--quiet")
            .env_remove("STOPTIMER_CONFIG")
            .env_remove("STOPTIMER_DURATION")
            .env_remove("STOPTIMER_UNITS")
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .expect("failed to spawn stoptimer");

        let stdin = child.stdin.take().expect("stdin not captured");
        let stdout = child.stdout.take().expect("stdout not captured");

        Self {
            child,
            stdin: Some(stdin),
            reader: BufReader::new(stdout),
        }
    }

    /// Runs a one-shot command and captures its output.
    #[allow(clippy::missing_panics_doc)]
    pub fn spawn_command(args: &[&str]) -> std::process::Output {
        std::process::Command::new(env!("CARGO_BIN_EXE_stoptimer"))
            .args(args)
            .env_remove("STOPTIMER_CONFIG")
            .env_remove("STOPTIMER_DURATION")
            .env_remove("STOPTIMER_UNITS")
            .env_remove("STOPTIMER_PAYLOAD")
            .env_remove("STOPTIMER_PAYLOAD_TYPE")
            .output()
            .expect("failed to run stoptimer")
    }

    /// Writes one input line.
    #[allow(clippy::missing_panics_doc)]
    pub async fn send_line(&mut self, line: &str) {
        let stdin = self.stdin.as_mut().expect("stdin already closed");
        stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("failed to write to stdin");
        stdin.flush().await.expect("failed to flush stdin");
    }

    /// Reads one event from stdout.
    ///
    /// Panics on EOF, I/O error, or if nothing arrives within `timeout`.
    #[allow(clippy::missing_panics_doc)]
    pub async fn read_event(&mut self, timeout: Duration) -> Value {
        let mut line = String::new();
        let result = tokio::time::timeout(timeout, async {
            loop {
                line.clear();
                let n = self
                    .reader
                    .read_line(&mut line)
                    .await
                    .expect("read_line I/O error");
                assert!(n > 0, "unexpected EOF from stoptimer");
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    return serde_json::from_str::<Value>(trimmed)
                        .unwrap_or_else(|e| panic!("invalid JSON: {e}\nline: {line}"));
                }
            }
        })
        .await;
        result.expect("timed out waiting for event")
    }

    /// Reads events until one of type `kind` arrives, returning it and the
    /// events skipped on the way.
    #[allow(clippy::missing_panics_doc)]
    pub async fn expect_event(&mut self, kind: &str) -> (Value, Vec<Value>) {
        let mut skipped = Vec::new();
        loop {
            let event = self.read_event(DEFAULT_TIMEOUT).await;
            if event["type"] == kind {
                return (event, skipped);
            }
            skipped.push(event);
        }
    }

    /// Closes stdin and waits for the process to exit, returning its exit
    /// code and any remaining events.
    #[allow(clippy::missing_panics_doc)]
    pub async fn finish(mut self) -> (Option<i32>, Vec<Value>) {
        drop(self.stdin.take());

        let mut rest = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            let n = tokio::time::timeout(DEFAULT_TIMEOUT, self.reader.read_line(&mut line))
                .await
                .expect("timed out draining stdout")
                .expect("read_line I/O error");
            if n == 0 {
                break;
            }
            if let Ok(v) = serde_json::from_str::<Value>(line.trim()) {
                rest.push(v);
            }
        }

        let status = tokio::time::timeout(DEFAULT_TIMEOUT, self.child.wait())
            .await
            .expect("timed out waiting for exit")
            .expect("wait failed");
        (status.code(), rest)
    }
}
