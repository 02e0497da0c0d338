//! The envelope sent to the host for execution, and a validating executor.

use std::sync::Arc;

use async_trait::async_trait;
use evos_core::{ToolError, ToolExecutor, ToolOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::catalogue;

/// A command the host executes in the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserCommand {
    /// Always `browser_command`
    #[serde(rename = "type")]
    pub kind: String,
    pub tool: String,
    pub parameters: Map<String, Value>,
}

impl BrowserCommand {
    pub fn new(tool: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            kind: "browser_command".into(),
            tool: tool.into(),
            parameters,
        }
    }
}

/// Checks each action against the catalogue before forwarding it.
pub struct ValidatingExecutor<E: ?Sized> {
    inner: Arc<E>,
}

impl<E: ToolExecutor + ?Sized> ValidatingExecutor<E> {
    pub fn new(inner: Arc<E>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<E: ToolExecutor + ?Sized> ToolExecutor for ValidatingExecutor<E> {
    async fn execute(
        &self,
        action: &str,
        params: &Map<String, Value>,
    ) -> Result<ToolOutcome, ToolError> {
        catalogue::validate_parameters(action, params)?;
        debug!(tool = action, "Parameters valid, forwarding");
        self.inner.execute(action, params).await
    }
}
