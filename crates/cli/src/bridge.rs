//! JSON-lines tool executor: one `BrowserCommand` out, one `ToolOutcome` back.
//!
//! The host on the other end of stdin/stdout runs the command in the page.

use std::time::Duration;

use async_trait::async_trait;
use evos_core::{ToolError, ToolExecutor, ToolOutcome};
use evos_tools::BrowserCommand;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct StdioBridge<R, W> {
    io: Mutex<(R, W)>,
    timeout: Duration,
}

impl StdioBridge<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> StdioBridge<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// How long to wait for the host's reply to each command.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The pieces back, for inspection.
    #[cfg(test)]
    fn into_inner(self) -> (R, W) {
        self.io.into_inner()
    }
}

fn failed(tool: &str, reason: impl std::fmt::Display) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl<R, W> ToolExecutor for StdioBridge<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn execute(
        &self,
        action: &str,
        params: &Map<String, Value>,
    ) -> Result<ToolOutcome, ToolError> {
        let command = BrowserCommand::new(action, params.clone());
        let mut line = serde_json::to_string(&command)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        line.push('\n');

        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;

        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| failed(action, e))?;
        writer.flush().await.map_err(|e| failed(action, e))?;
        debug!(tool = action, "Command sent to bridge");

        let mut reply = String::new();
        let read = tokio::time::timeout(self.timeout, reader.read_line(&mut reply))
            .await
            .map_err(|_| ToolError::Timeout {
                tool_name: action.to_string(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| failed(action, e))?;
        if read == 0 {
            return Err(failed(action, "bridge closed"));
        }

        serde_json::from_str(reply.trim()).map_err(|e| failed(action, format!("invalid outcome: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn params() -> Map<String, Value> {
        json!({"selector": "#login"}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn writes_command_and_reads_outcome() {
        let input = Cursor::new(b"{\"success\":true,\"data\":{\"clicked\":1}}\n".to_vec());
        let bridge = StdioBridge::new(input, Vec::new());

        let outcome = bridge.execute("click", &params()).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data, Some(json!({"clicked": 1})));

        let (_, written) = bridge.into_inner();
        let sent: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(
            sent,
            json!({"type": "browser_command", "tool": "click", "parameters": {"selector": "#login"}})
        );
        assert_eq!(written.last(), Some(&b'\n'));
    }

    #[tokio::test]
    async fn closed_input_fails() {
        let bridge = StdioBridge::new(Cursor::new(Vec::new()), Vec::new());
        let err = bridge.execute("click", &params()).await.unwrap_err();
        assert!(err.to_string().contains("bridge closed"));
    }

    #[tokio::test]
    async fn garbage_reply_fails() {
        let bridge = StdioBridge::new(Cursor::new(b"oops\n".to_vec()), Vec::new());
        let err = bridge.execute("scroll", &params()).await.unwrap_err();
        assert!(err.to_string().contains("invalid outcome"));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_host_times_out() {
        let (near, _far) = tokio::io::duplex(64);
        let bridge = StdioBridge::new(BufReader::new(near), Vec::new())
            .with_timeout(Duration::from_secs(5));
        let err = bridge.execute("navigate", &params()).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { timeout_secs: 5, .. }));
    }

    #[tokio::test]
    async fn host_reported_failure_is_an_outcome() {
        let input = Cursor::new(b"{\"success\":false,\"error\":\"no such element\"}\n".to_vec());
        let bridge = StdioBridge::new(input, Vec::new());
        let outcome = bridge.execute("click", &params()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("no such element"));
    }
}
