//! Task, Step, and the page context a task runs against.

use chrono::{DateTime, Utc};
use evos_core::ParsedReply;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Idle,
    Thinking,
    Acting,
    Waiting,
    Completed,
    Error,
}

impl TaskState {
    /// Whether the task can no longer change on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One iteration of reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based
    pub step_number: u32,
    pub thought: String,
    pub action: Option<String>,
    pub params: Option<Map<String, Value>>,
    /// Set after the action executes
    pub observation: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Step {
    pub fn from_reply(step_number: u32, reply: ParsedReply) -> Self {
        let params = reply.action.as_ref().map(|_| reply.params);
        Self {
            step_number,
            thought: reply.thought,
            action: reply.action,
            params,
            observation: None,
            timestamp: Utc::now(),
        }
    }
}

/// An element the host found on the page that the agent may act on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractiveElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// What the host knows about the current page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub interactive_elements: Vec<InteractiveElement>,
    /// Anything else the host sent along
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One user instruction being carried out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub description: String,
    pub context: PageContext,
    pub steps: Vec<Step>,
    pub state: TaskState,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(description: impl Into<String>, context: PageContext) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            context,
            steps: Vec::new(),
            state: TaskState::Idle,
            result: None,
            error: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub(crate) fn complete(&mut self, result: String) {
        self.state = TaskState::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: impl Into<String>) {
        self.state = TaskState::Error;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}
