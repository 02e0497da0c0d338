//! The fixed system preamble built once per task.

use crate::task::{InteractiveElement, PageContext};

const ATTRIBUTE_CHARS: usize = 50;

/// Limits applied when rendering the page into the preamble.
#[derive(Debug, Clone, Copy)]
pub struct PreambleLimits {
    pub content_chars: usize,
    pub max_elements: usize,
}

/// Build the system preamble for a task.
pub fn build_preamble(
    context: &PageContext,
    tools_text: &str,
    terminal_action: &str,
    limits: PreambleLimits,
) -> String {
    let max = limits.max_elements.min(context.interactive_elements.len());

    format!(
        r#"You are EVOS, an intelligent browser agent. You help users accomplish tasks on web pages by using available tools.

You follow the ReAct pattern:
1. THOUGHT: Analyze the current situation and decide what to do next
2. ACTION: Choose and execute a tool
3. OBSERVATION: Analyze the result
4. Repeat until task is complete

Current page context:
URL: {url}
Title: {title}
Page content summary: {summary}

Interactive elements on page:
{elements}

{tools_text}

IMPORTANT RULES:
- Always think step by step
- Use the most specific tool for each action
- If something fails, try an alternative approach
- When the task is complete, use the "{terminal_action}" tool
- Keep responses concise and focused

Respond in this JSON format:
{{
    "thought": "Your reasoning about what to do",
    "action": "tool_name",
    "action_input": {{"param1": "value1"}}
}}

Or if you're done:
{{
    "thought": "Task completed because...",
    "action": "{terminal_action}",
    "action_input": {{"message": "Here's what I found/did..."}}
}}"#,
        url = or_unknown(&context.url),
        title = or_unknown(&context.title),
        summary = summarize_content(&context.content, limits.content_chars),
        elements = format_elements(&context.interactive_elements[..max]),
    )
}

fn or_unknown(s: &str) -> &str {
    if s.trim().is_empty() { "unknown" } else { s }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Collapse whitespace and cap the page text.
pub fn summarize_content(content: &str, max_chars: usize) -> String {
    let collapsed = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "No content available".into();
    }
    if collapsed.chars().count() > max_chars {
        format!("{}...", truncate_chars(&collapsed, max_chars))
    } else {
        collapsed
    }
}

/// One line per element: `[tag] 'text' id=.. name=.. type=.. -> href`.
pub fn format_elements(elements: &[InteractiveElement]) -> String {
    if elements.is_empty() {
        return "No interactive elements detected".into();
    }

    fn present(v: &Option<String>) -> Option<&str> {
        v.as_deref().filter(|s| !s.is_empty())
    }

    elements
        .iter()
        .map(|el| {
            let mut line = format!("[{}]", present(&el.tag).unwrap_or("?"));
            if let Some(text) = present(&el.text) {
                line.push_str(&format!(" '{}'", truncate_chars(text, ATTRIBUTE_CHARS)));
            }
            if let Some(id) = present(&el.id) {
                line.push_str(&format!(" id={id}"));
            }
            if let Some(name) = present(&el.name) {
                line.push_str(&format!(" name={name}"));
            }
            if let Some(kind) = present(&el.kind) {
                line.push_str(&format!(" type={kind}"));
            }
            if let Some(href) = present(&el.href) {
                line.push_str(&format!(" -> {}", truncate_chars(href, ATTRIBUTE_CHARS)));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}
