//! Remote adapter for the Google Gemini API.
//!
//! Uses the REST surface of the Generative Language API:
//! - `GET  models/{model}` (probe)
//! - `POST models/{model}:generateContent`
//! - `POST models/{model}:streamGenerateContent?alt=sse`
//! - `POST models/{embedding_model}:embedContent`

use async_trait::async_trait;
use evos_config::GeminiConfig;
use evos_core::provider::{GenerateRequest, Provider, TextStream};
use evos_core::ProviderError;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

use crate::http;

#[derive(Debug)]
struct ProbeState {
    available: bool,
    model: String,
}

/// Gemini over HTTPS.
pub struct GeminiProvider {
    api_key: Option<String>,
    embedding_model: String,
    base_url: String,
    client: reqwest::Client,
    state: RwLock<ProbeState>,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            embedding_model: config.embedding_model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: http::client(config.request_timeout_secs),
            state: RwLock::new(ProbeState {
                available: false,
                model: config.model.clone(),
            }),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured(
                "No Gemini API key (set gemini.api_key or GEMINI_API_KEY)".into(),
            )
        })
    }

    /// The key and the model to use, once a probe has succeeded.
    async fn require_available(&self) -> Result<(&str, String), ProviderError> {
        let state = self.state.read().await;
        if !state.available {
            return Err(ProviderError::Unavailable(format!(
                "Gemini model '{}' has not been initialized",
                state.model
            )));
        }
        Ok((self.api_key()?, state.model.clone()))
    }

    /// Check that `model` exists and the key is accepted. Touches no state.
    async fn check_model(&self, model: &str) -> Result<(), ProviderError> {
        let key = self.api_key()?;
        let url = format!("{}/models/{}", self.base_url, model);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", key)
            .send()
            .await
            .map_err(http::transport)?;

        match response.status().as_u16() {
            400 | 401 | 403 => {
                return Err(ProviderError::AuthenticationFailed(
                    "Gemini rejected the API key".into(),
                ));
            }
            404 => return Err(ProviderError::ModelNotFound(model.to_string())),
            _ => {}
        }
        http::check_status("gemini", response).await?;
        Ok(())
    }

    async fn commit(&self, model: &str) {
        info!(provider = "gemini", model = %model, "Remote model available");
        let mut state = self.state.write().await;
        state.model = model.to_string();
        state.available = true;
    }

    fn to_api_request(request: &GenerateRequest) -> ApiRequest {
        ApiRequest {
            contents: vec![ApiContent {
                role: Some("user".into()),
                parts: vec![ApiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: request.system_prompt.as_ref().map(|s| ApiContent {
                role: None,
                parts: vec![ApiPart { text: s.clone() }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }

    async fn post_generate(
        &self,
        request: &GenerateRequest,
        method: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let (key, model) = self.require_available().await?;
        let url = format!("{}/models/{}:{}", self.base_url, model, method);

        debug!(provider = "gemini", model = %model, method, "Sending generation request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&Self::to_api_request(request))
            .send()
            .await
            .map_err(http::transport)?;

        http::check_status("gemini", response).await
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn model(&self) -> String {
        self.state.read().await.model.clone()
    }

    async fn is_available(&self) -> bool {
        self.state.read().await.available
    }

    /// Re-probe the current model. A failed probe leaves the previous state.
    async fn initialize(&self) -> Result<(), ProviderError> {
        let model = self.state.read().await.model.clone();
        self.check_model(&model).await?;
        self.commit(&model).await;
        Ok(())
    }

    async fn switch_model(&self, model: &str) -> Result<(), ProviderError> {
        self.check_model(model).await?;
        self.commit(model).await;
        Ok(())
    }

    fn tool_temperature(&self) -> f32 {
        0.1
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        let response = self.post_generate(&request, "generateContent").await?;

        let body: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        body.first_text().ok_or_else(|| ProviderError::ApiError {
            status_code: 200,
            message: "No candidates in response".into(),
        })
    }

    async fn generate_stream(&self, request: GenerateRequest) -> Result<TextStream, ProviderError> {
        let response = self
            .post_generate(&request, "streamGenerateContent?alt=sse")
            .await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Read the SSE byte stream and forward each chunk's text
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
                    if let Some(text) = parse_sse_line(&line)
                        && tx.send(Ok(text)).await.is_err()
                    {
                        return; // receiver dropped
                    }
                }
            }

            if let Some(text) = parse_sse_line(buffer.finish().trim_end()) {
                let _ = tx.send(Ok(text)).await;
            }
        });

        Ok(rx)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let (key, _) = self.require_available().await?;
        let url = format!(
            "{}/models/{}:embedContent",
            self.base_url, self.embedding_model
        );

        let body = serde_json::json!({
            "model": format!("models/{}", self.embedding_model),
            "content": {"parts": [{"text": text}]},
            "taskType": "RETRIEVAL_DOCUMENT",
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(http::transport)?;
        let response = http::check_status("gemini", response).await?;

        let parsed: EmbedResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        Ok(parsed.embedding.values)
    }
}

/// Extract the text of one `data: {...}` SSE line, if it carries any.
fn parse_sse_line(line: &str) -> Option<String> {
    // Skip empty lines and SSE comments
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?.trim();
    match serde_json::from_str::<ApiResponse>(data) {
        Ok(chunk) => chunk.first_text().filter(|t| !t.is_empty()),
        Err(e) => {
            trace!(error = %e, "Skipping unparseable SSE chunk");
            None
        }
    }
}

// --- Gemini API types (internal) ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    contents: Vec<ApiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct ApiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Serialize, Deserialize)]
struct ApiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ApiContent>,
}

impl ApiResponse {
    /// Concatenated text parts of the first candidate.
    fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        Some(
            candidate
                .content
                .as_ref()
                .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
                .unwrap_or_default(),
        )
    }
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Deserialize)]
struct EmbedValues {
    #[serde(default)]
    values: Vec<f32>,
}
