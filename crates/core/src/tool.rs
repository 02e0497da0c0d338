//! The tool executor boundary.
//!
//! The agent loop decides *which* action to take; the host decides *how* it
//! is carried out (usually by driving a page in the browser). The only thing
//! the loop sees is a [`ToolExecutor`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ToolError;

/// What the host reports back after running an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Whether the action succeeded
    pub success: bool,

    /// Optional structured data (extracted text, links, page info...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error text when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Host-supplied executor for chosen actions.
///
/// Returning `Err` is the executor "raising": the agent loop records the
/// error as the step's observation.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        action: &str,
        params: &Map<String, Value>,
    ) -> Result<ToolOutcome, ToolError>;
}
