//! Tolerant extraction of a structured decision from free-form model text.
//!
//! Models frequently wrap the JSON they were asked for in prose
//! ("Sure! Here is my answer: {...} Let me know..."). The extractor takes
//! the span from the **first** `{` to the **last** `}` and tries to parse
//! it as one JSON object.
//!
//! Known limitation: a reply holding several independent JSON objects
//! yields a span like `{..} text {..}`, which does not parse, so the whole
//! reply is treated as prose.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::provider::ToolDefinition;

/// The decision extracted from one ReAct reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedReply {
    /// The model's reasoning. The entire raw reply when no JSON was found.
    pub thought: String,
    /// The chosen action. `None` when the reply held no usable action.
    pub action: Option<String>,
    /// Parameters for the action (empty when absent).
    pub params: Map<String, Value>,
}

impl ParsedReply {
    fn prose(raw: &str) -> Self {
        Self {
            thought: raw.to_string(),
            action: None,
            params: Map::new(),
        }
    }

    /// Whether the reply named an action.
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }
}

/// The outcome of a prompt-engineered tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolReply {
    /// The model selected a tool.
    ToolCall {
        tool: String,
        parameters: Map<String, Value>,
        raw_response: String,
    },
    /// The model answered in plain text.
    Text { content: String },
}

/// Locate the candidate JSON span: first `{` through last `}` inclusive.
pub fn extract_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Parse the span into a JSON object, if it is one.
fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let span = extract_json_span(raw)?;
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(obj)) => Some(obj),
        Ok(_) => None,
        Err(e) => {
            tracing::trace!(error = %e, "Reply span is not valid JSON");
            None
        }
    }
}

fn object_field(obj: &Map<String, Value>, key: &str) -> Map<String, Value> {
    match obj.get(key) {
        Some(Value::Object(m)) => m.clone(),
        _ => Map::new(),
    }
}

/// Parse a ReAct reply of the form
/// `{"thought": "...", "action": "...", "action_input": {...}}`.
pub fn parse_reply(raw: &str) -> ParsedReply {
    let Some(obj) = extract_object(raw) else {
        return ParsedReply::prose(raw);
    };

    let thought = match obj.get("thought") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from);

    ParsedReply {
        thought,
        action,
        params: object_field(&obj, "action_input"),
    }
}

/// Parse a tool-calling reply of the form `{"tool": "...", "parameters": {...}}`.
pub fn parse_tool_reply(raw: &str) -> ToolReply {
    if let Some(obj) = extract_object(raw)
        && let Some(tool) = obj.get("tool").and_then(Value::as_str)
    {
        return ToolReply::ToolCall {
            tool: tool.to_string(),
            parameters: object_field(&obj, "parameters"),
            raw_response: raw.to_string(),
        };
    }
    ToolReply::Text {
        content: raw.to_string(),
    }
}

const DEFAULT_TOOL_SYSTEM: &str = "You are a helpful AI assistant.";

/// Build the system prompt that teaches a model without native function
/// calling to pick a tool by replying with a single JSON object.
pub fn tool_system_prompt(system: Option<&str>, tools: &[ToolDefinition]) -> String {
    let descriptions = tools
        .iter()
        .map(|t| format!("- {}: {}\n  Parameters: {}", t.name, t.description, t.parameters))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nYou have access to the following tools:\n{}\n\n\
         When you need to use a tool, respond with JSON in this exact format:\n\
         {{\"tool\": \"tool_name\", \"parameters\": {{\"param1\": \"value1\"}}}}\n\n\
         If you don't need a tool, just respond normally with text.\n\
         Always think step by step before using tools.",
        system.unwrap_or(DEFAULT_TOOL_SYSTEM),
        descriptions
    )
}
