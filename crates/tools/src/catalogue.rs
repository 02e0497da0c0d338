//! Declarations of the browser tools the agent may choose from.
//!
//! These are declarations only: the host executes them inside the page.

use std::sync::OnceLock;

use evos_core::{ToolDefinition, ToolError};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// The name of the terminal action.
pub const ANSWER_USER: &str = "answer_user";

/// Broad category of a browser tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Navigation,
    Interaction,
    Extraction,
    Memory,
    System,
}

/// One declared parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub choices: Option<&'static [&'static str]>,
}

impl ParamSpec {
    fn new(name: &'static str, kind: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description: Some(description),
            default: None,
            choices: None,
        }
    }

    fn choice(name: &'static str, choices: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: "string",
            description: None,
            default: None,
            choices: Some(choices),
        }
    }

    fn or(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// A parameter without a default must be supplied.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.kind));
        if let Some(d) = self.description {
            schema.insert("description".into(), json!(d));
        }
        if let Some(ref d) = self.default {
            schema.insert("default".into(), d.clone());
        }
        if let Some(c) = self.choices {
            schema.insert("enum".into(), json!(c));
        }
        Value::Object(schema)
    }
}

/// A browser tool declaration.
#[derive(Debug, Clone, Serialize)]
pub struct BrowserTool {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ToolKind,
    pub params: Vec<ParamSpec>,
}

impl BrowserTool {
    fn new(
        name: &'static str,
        description: &'static str,
        kind: ToolKind,
        params: Vec<ParamSpec>,
    ) -> Self {
        Self {
            name,
            description,
            kind,
            params,
        }
    }

    /// The definition presented to the model.
    pub fn definition(&self) -> ToolDefinition {
        let parameters: Map<String, Value> = self
            .params
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        ToolDefinition {
            name: self.name.into(),
            description: self.description.into(),
            parameters: Value::Object(parameters),
        }
    }
}

fn build() -> Vec<BrowserTool> {
    use ToolKind::*;
    let p = ParamSpec::new;

    vec![
        BrowserTool::new(
            "navigate",
            "Navigate to a URL or perform search",
            Navigation,
            vec![
                p("url", "string", "URL to navigate to, or search query"),
                p("new_tab", "boolean", "Open in new tab").or(json!(false)),
            ],
        ),
        BrowserTool::new(
            "click",
            "Click on an element on the page",
            Interaction,
            vec![
                p("selector", "string", "CSS selector or text content to find element"),
                p("description", "string", "Human description of what to click"),
            ],
        ),
        BrowserTool::new(
            "type_text",
            "Type text into an input field",
            Interaction,
            vec![
                p("selector", "string", "CSS selector of the input field"),
                p("text", "string", "Text to type"),
                p("clear_first", "boolean", "Clear field before typing").or(json!(true)),
            ],
        ),
        BrowserTool::new(
            "scroll",
            "Scroll the page",
            Interaction,
            vec![
                ParamSpec::choice("direction", &["up", "down", "top", "bottom"]),
                p("amount", "integer", "Pixels to scroll").or(json!(500)),
            ],
        ),
        BrowserTool::new(
            "extract_text",
            "Extract text content from elements",
            Extraction,
            vec![
                p("selector", "string", "CSS selector to extract from"),
                p("multiple", "boolean", "Extract from all matching elements").or(json!(false)),
            ],
        ),
        BrowserTool::new(
            "extract_links",
            "Extract all links from the page or specific section",
            Extraction,
            vec![
                p("selector", "string", "CSS selector to limit scope").or(json!("body")),
                p("filter", "string", "Filter links containing this text"),
            ],
        ),
        BrowserTool::new(
            "extract_table",
            "Extract data from a table",
            Extraction,
            vec![p("selector", "string", "CSS selector of the table")],
        ),
        BrowserTool::new(
            "fill_form",
            "Fill out a form with provided data",
            Interaction,
            vec![
                p("form_selector", "string", "CSS selector of the form"),
                p("data", "object", "Key-value pairs of field names and values"),
                p("submit", "boolean", "Submit form after filling").or(json!(false)),
            ],
        ),
        BrowserTool::new(
            "wait",
            "Wait for a condition",
            System,
            vec![
                ParamSpec::choice("type", &["time", "element", "navigation"]),
                p("value", "string", "Milliseconds, selector, or URL pattern"),
            ],
        ),
        BrowserTool::new(
            "screenshot",
            "Take a screenshot of the page",
            Extraction,
            vec![
                p("selector", "string", "CSS selector to screenshot (optional)"),
                p("full_page", "boolean", "Capture full page").or(json!(false)),
            ],
        ),
        BrowserTool::new(
            "get_page_info",
            "Get information about the current page",
            Extraction,
            vec![],
        ),
        BrowserTool::new(
            "remember_page",
            "Save the current page to memory for later recall",
            Memory,
            vec![
                p("tags", "array", "Tags to categorize this page"),
                p("note", "string", "Note about why this page is important"),
            ],
        ),
        BrowserTool::new(
            "search_memory",
            "Search through remembered pages and information",
            Memory,
            vec![p("query", "string", "What to search for")],
        ),
        BrowserTool::new("go_back", "Go back to the previous page", Navigation, vec![]),
        BrowserTool::new("go_forward", "Go forward in browser history", Navigation, vec![]),
        BrowserTool::new("refresh", "Refresh the current page", Navigation, vec![]),
        BrowserTool::new(
            "select_option",
            "Select an option from a dropdown",
            Interaction,
            vec![
                p("selector", "string", "CSS selector of the select element"),
                p("value", "string", "Value or text of option to select"),
            ],
        ),
        BrowserTool::new(
            "hover",
            "Hover over an element",
            Interaction,
            vec![p("selector", "string", "CSS selector of element to hover")],
        ),
        BrowserTool::new(
            "press_key",
            "Press a keyboard key",
            Interaction,
            vec![
                p("key", "string", "Key to press (Enter, Escape, Tab, etc.)"),
                p("modifiers", "array", "Modifier keys (ctrl, shift, alt)"),
            ],
        ),
        BrowserTool::new(
            ANSWER_USER,
            "Provide a final answer or response to the user",
            System,
            vec![
                p("message", "string", "The response to show to the user"),
                p("data", "object", "Optional structured data to include"),
            ],
        ),
    ]
}

/// All browser tools, in presentation order.
pub fn catalogue() -> &'static [BrowserTool] {
    static CATALOGUE: OnceLock<Vec<BrowserTool>> = OnceLock::new();
    CATALOGUE.get_or_init(build)
}

pub fn find(name: &str) -> Option<&'static BrowserTool> {
    catalogue().iter().find(|t| t.name == name)
}

/// The catalogue as model-facing definitions.
pub fn definitions() -> Vec<ToolDefinition> {
    catalogue().iter().map(BrowserTool::definition).collect()
}

/// Render tool definitions as the compact list used in the agent preamble.
pub fn format_for_prompt(tools: &[ToolDefinition]) -> String {
    let mut lines = vec!["Available tools:".to_string()];
    for tool in tools {
        let params = match tool.parameters.as_object() {
            Some(map) if !map.is_empty() => map
                .iter()
                .map(|(k, v)| format!("{k}: {}", v["type"].as_str().unwrap_or("any")))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "none".to_string(),
        };
        lines.push(format!(
            "- {}: {} (params: {params})",
            tool.name, tool.description
        ));
    }
    lines.join("\n")
}

fn matches_kind(kind: &str, value: &Value) -> bool {
    match kind {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

/// Check `params` against the declaration of `name`.
///
/// Every required parameter must be present. Supplied values must match the
/// declared type and, for enumerated parameters, one of the allowed choices.
/// Keys the tool does not declare pass through untouched.
pub fn validate_parameters(name: &str, params: &Map<String, Value>) -> Result<(), ToolError> {
    let tool = find(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;

    if let Some(missing) = tool
        .params
        .iter()
        .find(|p| p.is_required() && !params.contains_key(p.name))
    {
        return Err(ToolError::InvalidArguments(format!(
            "Missing required parameter: {}",
            missing.name
        )));
    }

    for spec in &tool.params {
        let Some(value) = params.get(spec.name) else {
            continue;
        };
        if !matches_kind(spec.kind, value) {
            return Err(ToolError::InvalidArguments(format!(
                "Parameter '{}' must be {}, got {value}",
                spec.name, spec.kind
            )));
        }
        if let Some(choices) = spec.choices
            && !value.as_str().is_some_and(|v| choices.contains(&v))
        {
            return Err(ToolError::InvalidArguments(format!(
                "Parameter '{}' must be one of {}, got {value}",
                spec.name,
                choices.join(", ")
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn catalogue_has_twenty_unique_tools() {
        let names: Vec<_> = catalogue().iter().map(|t| t.name).collect();
        assert_eq!(names.len(), 20);
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 20);
        assert_eq!(names.last(), Some(&ANSWER_USER));
    }

    #[test]
    fn find_by_name() {
        let scroll = find("scroll").unwrap();
        assert_eq!(scroll.kind, ToolKind::Interaction);
        assert!(find("teleport").is_none());
    }

    #[test]
    fn definition_carries_schema() {
        let def = find("scroll").unwrap().definition();
        assert_eq!(def.parameters["direction"]["enum"], json!(["up", "down", "top", "bottom"]));
        assert_eq!(def.parameters["amount"]["default"], json!(500));

        let empty = find("refresh").unwrap().definition();
        assert_eq!(empty.parameters, json!({}));
    }

    #[test]
    fn prompt_format() {
        let text = format_for_prompt(&definitions());
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Available tools:"));
        assert_eq!(
            lines.next(),
            Some("- navigate: Navigate to a URL or perform search (params: url: string, new_tab: boolean)")
        );
        assert!(text.contains("- go_back: Go back to the previous page (params: none)"));
    }

    #[test]
    fn prompt_format_defaults_missing_type_to_any() {
        let tools = vec![ToolDefinition {
            name: "custom".into(),
            description: "Custom".into(),
            parameters: json!({"x": {}}),
        }];
        assert!(format_for_prompt(&tools).ends_with("- custom: Custom (params: x: any)"));
    }

    #[test]
    fn validation_rejects_unknown_tool() {
        assert!(matches!(
            validate_parameters("teleport", &Map::new()),
            Err(ToolError::NotFound(name)) if name == "teleport"
        ));
    }

    #[test]
    fn validation_requires_non_default_params() {
        let err = validate_parameters("type_text", &params(json!({"selector": "#q"}))).unwrap_err();
        match err {
            ToolError::InvalidArguments(msg) => {
                assert_eq!(msg, "Missing required parameter: text")
            }
            other => panic!("unexpected error {other:?}"),
        }

        // clear_first has a default
        assert!(
            validate_parameters("type_text", &params(json!({"selector": "#q", "text": "rust"})))
                .is_ok()
        );
        assert!(validate_parameters("go_back", &Map::new()).is_ok());
    }

    fn invalid(name: &str, v: Value) -> String {
        match validate_parameters(name, &params(v)) {
            Err(ToolError::InvalidArguments(msg)) => msg,
            other => panic!("expected invalid arguments, got {other:?}"),
        }
    }

    #[test]
    fn validation_checks_declared_types() {
        assert_eq!(
            invalid("scroll", json!({"direction": "down", "amount": "300"})),
            r#"Parameter 'amount' must be integer, got "300""#
        );
        assert_eq!(
            invalid("navigate", json!({"url": "https://example.com", "new_tab": "yes"})),
            r#"Parameter 'new_tab' must be boolean, got "yes""#
        );
        assert_eq!(
            invalid("fill_form", json!({"form_selector": "form", "data": ["a"]})),
            r#"Parameter 'data' must be object, got ["a"]"#
        );
        assert!(
            invalid("scroll", json!({"direction": "down", "amount": 2.5}))
                .starts_with("Parameter 'amount' must be integer")
        );

        assert!(
            validate_parameters(
                "fill_form",
                &params(json!({"form_selector": "form", "data": {"q": "rust"}, "submit": true}))
            )
            .is_ok()
        );
    }

    #[test]
    fn validation_checks_enumerated_choices() {
        assert_eq!(
            invalid("scroll", json!({"direction": "sideways"})),
            r#"Parameter 'direction' must be one of up, down, top, bottom, got "sideways""#
        );
        assert_eq!(
            invalid("scroll", json!({"direction": 1})),
            "Parameter 'direction' must be string, got 1"
        );
        assert!(validate_parameters("scroll", &params(json!({"direction": "top", "amount": 0}))).is_ok());
        assert!(
            validate_parameters("wait", &params(json!({"type": "time", "value": "1000"}))).is_ok()
        );
    }

    #[test]
    fn validation_ignores_undeclared_keys() {
        assert!(
            validate_parameters("hover", &params(json!({"selector": "#a", "force": 1}))).is_ok()
        );
    }
}
