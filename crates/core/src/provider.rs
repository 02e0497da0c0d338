//! Provider trait: the uniform capability interface over model backends.
//!
//! A Provider knows how to probe its backend, turn a prompt into text
//! (whole or streamed), pick a tool by prompt engineering, and embed text.
//!
//! Implementations: a local Ollama daemon and the remote Gemini API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::parser::{self, ToolReply};

/// A single text-generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The user-side prompt.
    pub prompt: String,

    /// Optional system instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A tool definition presented to the model inside the system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// Parameter schema (name → type/description)
    pub parameters: serde_json::Value,
}

/// A lazily produced sequence of text chunks. Restart by issuing a new call.
pub type TextStream = mpsc::Receiver<Result<String, ProviderError>>;

/// The core Provider trait.
///
/// Availability is decided once by [`Provider::initialize`]; later per-call
/// failures are reported as errors on the call, never by flipping the flag.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "ollama", "gemini").
    fn name(&self) -> &str;

    /// The model identifier currently in use.
    async fn model(&self) -> String;

    /// Whether the last probe succeeded.
    async fn is_available(&self) -> bool;

    /// Probe the backend. `Ok(())` means the provider is now available.
    async fn initialize(&self) -> Result<(), ProviderError>;

    /// Generate a complete reply.
    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError>;

    /// Generate a reply as a stream of text chunks.
    ///
    /// Default implementation calls `generate()` and yields the result as a
    /// single chunk.
    async fn generate_stream(&self, request: GenerateRequest) -> Result<TextStream, ProviderError> {
        let text = self.generate(request).await?;
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }

    /// Temperature used for tool selection.
    fn tool_temperature(&self) -> f32 {
        0.3
    }

    /// Ask the model to pick one of `tools`.
    ///
    /// Neither backend is assumed to support native function calling, so the
    /// tools are enumerated in the system prompt and the reply is parsed with
    /// the same first-brace/last-brace extraction as the ReAct parser.
    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[ToolDefinition],
        system_prompt: Option<&str>,
    ) -> Result<ToolReply, ProviderError> {
        let request = GenerateRequest::new(prompt)
            .with_system(parser::tool_system_prompt(system_prompt, tools))
            .with_temperature(self.tool_temperature());
        let text = self.generate(request).await?;
        Ok(parser::parse_tool_reply(&text))
    }

    /// Embed a text.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }

    /// Point the adapter at another model.
    ///
    /// The new model is checked first. On failure the adapter keeps its
    /// current model and availability.
    async fn switch_model(&self, _model: &str) -> Result<(), ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support switching models",
            self.name()
        )))
    }
}
