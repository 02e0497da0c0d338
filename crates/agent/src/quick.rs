//! One-shot replies about the current page, without the ReAct loop.

use std::sync::Arc;

use evos_core::parser::extract_json_span;
use evos_core::provider::GenerateRequest;
use evos_core::ProviderError;
use evos_providers::EngineRouter;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::task::PageContext;

const CONTENT_CHARS: usize = 3000;

/// A quick reply: either a page command or plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuickReply {
    Command {
        command: String,
        params: Map<String, Value>,
        /// Prose before the JSON, if any
        message: String,
    },
    Text {
        message: String,
    },
}

pub struct QuickResponder {
    router: Arc<EngineRouter>,
}

impl QuickResponder {
    pub fn new(router: Arc<EngineRouter>) -> Self {
        Self { router }
    }

    pub async fn respond(
        &self,
        message: &str,
        context: &PageContext,
    ) -> Result<QuickReply, ProviderError> {
        let request = GenerateRequest::new(message)
            .with_system(system_prompt(context))
            .with_temperature(0.5)
            .with_max_tokens(512);

        let raw = self.router.generate(request).await?;
        let reply = parse_quick_reply(&raw);
        debug!(command = matches!(reply, QuickReply::Command { .. }), "Quick reply");
        Ok(reply)
    }
}

fn system_prompt(context: &PageContext) -> String {
    let content: String = context.content.chars().take(CONTENT_CHARS).collect();
    format!(
        r#"You are EVOS, a helpful browser assistant. Analyze the user's request and the current page to provide a helpful response.

Current page:
URL: {url}
Title: {title}
Content: {content}

If the user asks you to do something on the page, respond with a JSON command:
{{"command": "tool_name", "params": {{...}}}}

Available commands: navigate, click, type_text, scroll, extract_text, extract_links

If the user asks a question, just answer it directly based on the page content.

Be concise and helpful."#,
        url = context.url,
        title = context.title,
    )
}

/// Classify a reply as a command (JSON object with a `command` key) or text.
pub fn parse_quick_reply(raw: &str) -> QuickReply {
    if let Some(span) = extract_json_span(raw)
        && let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(span)
        && let Some(command) = obj.get("command")
    {
        let start = raw.find('{').unwrap_or(0);
        return QuickReply::Command {
            command: match command {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            params: match obj.get("params") {
                Some(Value::Object(m)) => m.clone(),
                _ => Map::new(),
            },
            message: raw[..start].trim().to_string(),
        };
    }
    QuickReply::Text {
        message: raw.to_string(),
    }
}
