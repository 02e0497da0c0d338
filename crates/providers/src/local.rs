//! Local inference adapter backed by an Ollama daemon.
//!
//! Talks to the daemon's native API:
//! - `GET /api/tags` to probe which models are installed
//! - `POST /api/chat` for whole and streamed (NDJSON) replies
//! - `POST /api/embeddings` for vectors

use async_trait::async_trait;
use evos_config::OllamaConfig;
use evos_core::provider::{GenerateRequest, Provider, TextStream};
use evos_core::ProviderError;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};

use crate::http;

#[derive(Debug)]
struct ProbeState {
    available: bool,
    /// The model asked for, by config or by `switch_model`
    wanted: String,
    /// The model actually in use; the fallback when `wanted` is missing
    model: String,
}

/// A model served by a local Ollama daemon.
pub struct OllamaProvider {
    host: String,
    fallback_model: String,
    client: reqwest::Client,
    state: RwLock<ProbeState>,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            host: config.host.trim_end_matches('/').to_string(),
            fallback_model: config.fallback_model.clone(),
            client: http::client(config.request_timeout_secs),
            state: RwLock::new(ProbeState {
                available: false,
                wanted: config.default_model.clone(),
                model: config.default_model.clone(),
            }),
        }
    }

    /// Pick the model to use from the installed list.
    ///
    /// The wanted model matches by exact name or by family (the text
    /// before `:`), so `llama3.2:latest` satisfies `llama3.2:3b`.
    fn select_model(&self, wanted: &str, installed: &[String]) -> Option<String> {
        let family = |name: &str| name.split(':').next().unwrap_or(name).to_string();
        let wanted_family = family(wanted);

        if installed.iter().any(|m| m == wanted)
            || installed.iter().any(|m| family(m) == wanted_family)
        {
            return Some(wanted.to_string());
        }

        if installed.iter().any(|m| *m == self.fallback_model) {
            return Some(self.fallback_model.clone());
        }

        None
    }

    async fn fetch_installed(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.host);
        let response = self.client.get(&url).send().await.map_err(http::transport)?;
        let response = http::check_status("ollama", response).await?;

        let tags: TagsResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse model list: {e}"),
        })?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Resolve `wanted` against the daemon without touching any state.
    async fn resolve(&self, wanted: &str) -> Result<String, ProviderError> {
        let installed = self.fetch_installed().await?;

        let Some(model) = self.select_model(wanted, &installed) else {
            return Err(ProviderError::ModelNotFound(format!(
                "neither '{}' nor '{}' is installed (available: {})",
                wanted,
                self.fallback_model,
                if installed.is_empty() {
                    "none".to_string()
                } else {
                    installed.join(", ")
                }
            )));
        };

        if model != wanted {
            warn!(
                wanted = %wanted,
                using = %model,
                "Requested model not installed, using fallback"
            );
        }
        Ok(model)
    }

    async fn commit(&self, wanted: &str, model: String) {
        info!(provider = "ollama", model = %model, "Local model available");
        let mut state = self.state.write().await;
        state.wanted = wanted.to_string();
        state.model = model;
        state.available = true;
    }

    async fn require_available(&self) -> Result<String, ProviderError> {
        let state = self.state.read().await;
        if !state.available {
            return Err(ProviderError::Unavailable(format!(
                "Ollama at {} has not been initialized",
                self.host
            )));
        }
        Ok(state.model.clone())
    }

    fn chat_body(model: &str, request: &GenerateRequest, stream: bool) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

        serde_json::json!({
            "model": model,
            "messages": messages,
            "stream": stream,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            },
        })
    }

    async fn post_chat(
        &self,
        request: &GenerateRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let model = self.require_available().await?;
        let url = format!("{}/api/chat", self.host);

        debug!(provider = "ollama", model = %model, stream, "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&Self::chat_body(&model, request, stream))
            .send()
            .await
            .map_err(http::transport)?;

        http::check_status("ollama", response).await
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn model(&self) -> String {
        self.state.read().await.model.clone()
    }

    async fn is_available(&self) -> bool {
        self.state.read().await.available
    }

    /// Check the wanted model again. On failure the previous state stays.
    async fn initialize(&self) -> Result<(), ProviderError> {
        let wanted = self.state.read().await.wanted.clone();
        let model = self.resolve(&wanted).await?;
        self.commit(&wanted, model).await;
        Ok(())
    }

    async fn switch_model(&self, model: &str) -> Result<(), ProviderError> {
        let selected = self.resolve(model).await?;
        self.commit(model, selected).await;
        Ok(())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        let response = self.post_chat(&request, false).await?;

        let chat: ChatResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        Ok(chat.message.map(|m| m.content).unwrap_or_default())
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<TextStream, ProviderError> {
        let response = self.post_chat(&request, true).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // One JSON object per line; forward each non-empty content delta
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = http::LineBuffer::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push(&bytes);

                while let Some(line) = buffer.next_line() {
                    match parse_stream_line(line.trim()) {
                        StreamLine::Content(text) => {
                            if tx.send(Ok(text)).await.is_err() {
                                return; // receiver dropped
                            }
                        }
                        StreamLine::Done => return,
                        StreamLine::Skip => {}
                    }
                }
            }

            // Trailing line without a newline
            if let StreamLine::Content(text) = parse_stream_line(buffer.finish().trim()) {
                let _ = tx.send(Ok(text)).await;
            }
        });

        Ok(rx)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let model = self.require_available().await?;
        let url = format!("{}/api/embeddings", self.host);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({"model": model, "prompt": text}))
            .send()
            .await
            .map_err(http::transport)?;
        let response = http::check_status("ollama", response).await?;

        let body: EmbeddingResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        Ok(body.embedding)
    }
}

#[derive(Debug, PartialEq)]
enum StreamLine {
    Content(String),
    Done,
    Skip,
}

fn parse_stream_line(line: &str) -> StreamLine {
    if line.is_empty() {
        return StreamLine::Skip;
    }
    match serde_json::from_str::<ChatResponse>(line) {
        Ok(chunk) => {
            let content = chunk.message.map(|m| m.content).unwrap_or_default();
            if !content.is_empty() {
                StreamLine::Content(content)
            } else if chunk.done {
                StreamLine::Done
            } else {
                StreamLine::Skip
            }
        }
        Err(e) => {
            trace!(error = %e, "Skipping unparseable stream line");
            StreamLine::Skip
        }
    }
}

// --- Ollama API types (internal) ---

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}
