//! Engine router: owns both adapters and delegates to whichever is active.
//!
//! Startup probing falls back from remote to local deterministically, and an
//! explicit mode switch only swaps adapters when the target's probe succeeds.

use std::sync::Arc;

use evos_config::AppConfig;
use evos_core::parser::ToolReply;
use evos_core::provider::{GenerateRequest, Provider, TextStream, ToolDefinition};
use evos_core::{Mode, ProviderError};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::local::OllamaProvider;
use crate::remote::GeminiProvider;

/// A point-in-time view of the router, for status displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterStatus {
    pub mode: Mode,
    pub provider: String,
    pub model: String,
    pub available: bool,
}

/// Routes generation calls to the local or remote adapter.
pub struct EngineRouter {
    local: Arc<dyn Provider>,
    remote: Arc<dyn Provider>,
    configured: Mode,
    active: RwLock<Mode>,
    /// Serializes `initialize`, `switch_mode` and `switch_model`.
    switch_lock: Mutex<()>,
}

impl EngineRouter {
    /// Create a router over two adapters. Local is active until `initialize`.
    pub fn new(local: Arc<dyn Provider>, remote: Arc<dyn Provider>, configured: Mode) -> Self {
        Self {
            local,
            remote,
            configured,
            active: RwLock::new(Mode::Local),
            switch_lock: Mutex::new(()),
        }
    }

    /// Build the Ollama and Gemini adapters from configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(OllamaProvider::new(&config.ollama)),
            Arc::new(GeminiProvider::new(&config.gemini)),
            config.ai_mode,
        )
    }

    fn adapter(&self, mode: Mode) -> &Arc<dyn Provider> {
        match mode {
            Mode::Local => &self.local,
            Mode::Remote => &self.remote,
        }
    }

    /// Probe the configured engine, falling back to local.
    ///
    /// Local is always activated when remote is not, even if its probe
    /// fails; the return value reports whether the active adapter is usable.
    pub async fn initialize(&self) -> bool {
        let _guard = self.switch_lock.lock().await;
        info!(mode = %self.configured, "Initializing engine router");

        if self.configured == Mode::Remote {
            match self.remote.initialize().await {
                Ok(()) => {
                    *self.active.write().await = Mode::Remote;
                    info!(
                        provider = self.remote.name(),
                        model = %self.remote.model().await,
                        "Remote engine active"
                    );
                    return true;
                }
                Err(e) => {
                    warn!(error = %e, "Remote engine unavailable, falling back to local");
                }
            }
        }

        let result = self.local.initialize().await;
        *self.active.write().await = Mode::Local;
        match result {
            Ok(()) => {
                info!(
                    provider = self.local.name(),
                    model = %self.local.model().await,
                    "Local engine active"
                );
                true
            }
            Err(e) => {
                warn!(error = %e, "Local engine unavailable");
                false
            }
        }
    }

    /// Switch to `target` if its probe succeeds. On failure nothing changes.
    pub async fn switch_mode(&self, target: Mode) -> bool {
        let _guard = self.switch_lock.lock().await;
        info!(target = %target, "Switching engine mode");

        match self.adapter(target).initialize().await {
            Ok(()) => {
                *self.active.write().await = target;
                info!(mode = %target, "Engine mode switched");
                true
            }
            Err(e) => {
                warn!(target = %target, error = %e, "Mode switch failed, keeping current engine");
                false
            }
        }
    }

    /// Point the active adapter at another model.
    ///
    /// The adapter checks the model first and keeps its current one if the
    /// check fails. The mode never changes.
    pub async fn switch_model(&self, model: &str) -> bool {
        let _guard = self.switch_lock.lock().await;
        let mode = *self.active.read().await;
        info!(mode = %mode, model, "Switching model");

        match self.adapter(mode).switch_model(model).await {
            Ok(()) => {
                info!(mode = %mode, model, "Model switched");
                true
            }
            Err(e) => {
                warn!(mode = %mode, model, error = %e, "Model switch failed, keeping current model");
                false
            }
        }
    }

    /// The active mode.
    pub async fn mode(&self) -> Mode {
        *self.active.read().await
    }

    /// The mode requested by configuration.
    pub fn configured_mode(&self) -> Mode {
        self.configured
    }

    /// The active adapter.
    pub async fn active(&self) -> Arc<dyn Provider> {
        self.adapter(self.mode().await).clone()
    }

    /// The active adapter's model identifier.
    pub async fn model(&self) -> String {
        self.active().await.model().await
    }

    /// Whether the active adapter's last probe succeeded.
    pub async fn is_available(&self) -> bool {
        self.active().await.is_available().await
    }

    pub async fn status(&self) -> RouterStatus {
        let mode = self.mode().await;
        let provider = self.adapter(mode).clone();
        RouterStatus {
            mode,
            provider: provider.name().to_string(),
            model: provider.model().await,
            available: provider.is_available().await,
        }
    }

    // --- Delegation ---

    pub async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        self.active().await.generate(request).await
    }

    pub async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<TextStream, ProviderError> {
        self.active().await.generate_stream(request).await
    }

    pub async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[ToolDefinition],
        system_prompt: Option<&str>,
    ) -> Result<ToolReply, ProviderError> {
        self.active()
            .await
            .generate_with_tools(prompt, tools, system_prompt)
            .await
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.active().await.embed(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedProvider;
    use crate::test_server::{live_tags, serve};
    use axum::routing::post;
    use std::sync::Mutex as StdMutex;

    fn router(
        local_ok: bool,
        remote_ok: bool,
        configured: Mode,
    ) -> (Arc<ScriptedProvider>, Arc<ScriptedProvider>, EngineRouter) {
        let local = Arc::new(
            ScriptedProvider::new(["from local"])
                .with_name("local-mock")
                .with_model("small")
                .with_probe(local_ok),
        );
        let remote = Arc::new(
            ScriptedProvider::new(["from remote"])
                .with_name("remote-mock")
                .with_model("large")
                .with_probe(remote_ok),
        );
        let r = EngineRouter::new(local.clone(), remote.clone(), configured);
        (local, remote, r)
    }

    #[tokio::test]
    async fn remote_mode_activates_remote() {
        let (local, _remote, r) = router(true, true, Mode::Remote);
        assert!(r.initialize().await);
        assert_eq!(r.mode().await, Mode::Remote);
        assert_eq!(r.model().await, "large");
        assert_eq!(local.probe_count(), 0);
        assert_eq!(r.generate(GenerateRequest::new("x")).await.unwrap(), "from remote");
    }

    #[tokio::test]
    async fn remote_failure_falls_back_to_local() {
        let (local, remote, r) = router(true, false, Mode::Remote);
        assert!(r.initialize().await);
        assert_eq!(r.mode().await, Mode::Local);
        assert_eq!(remote.probe_count(), 1);
        assert_eq!(local.probe_count(), 1);
        assert_eq!(r.generate(GenerateRequest::new("x")).await.unwrap(), "from local");
    }

    #[tokio::test]
    async fn local_is_active_even_when_probe_fails() {
        let (_local, _remote, r) = router(false, false, Mode::Remote);
        assert!(!r.initialize().await);
        assert_eq!(r.mode().await, Mode::Local);
        assert!(!r.is_available().await);

        let status = r.status().await;
        assert_eq!(status.provider, "local-mock");
        assert!(!status.available);
    }

    #[tokio::test]
    async fn local_mode_skips_remote_probe() {
        let (_local, remote, r) = router(true, true, Mode::Local);
        assert!(r.initialize().await);
        assert_eq!(r.mode().await, Mode::Local);
        assert_eq!(remote.probe_count(), 0);
    }

    #[tokio::test]
    async fn switch_remote_then_local() {
        let (_local, _remote, r) = router(true, true, Mode::Local);
        r.initialize().await;

        assert!(r.switch_mode(Mode::Remote).await);
        assert_eq!(r.mode().await, Mode::Remote);
        assert!(r.switch_mode(Mode::Local).await);
        assert_eq!(r.mode().await, Mode::Local);
        assert_eq!(r.status().await.provider, "local-mock");
    }

    #[tokio::test]
    async fn failed_switch_changes_nothing() {
        let (_local, remote, r) = router(true, false, Mode::Local);
        r.initialize().await;

        assert!(!r.switch_mode(Mode::Remote).await);
        assert_eq!(r.mode().await, Mode::Local);
        assert_eq!(r.model().await, "small");
        assert!(r.is_available().await);
        assert_eq!(remote.probe_count(), 1);
    }

    #[tokio::test]
    async fn switch_to_current_mode_reprobes() {
        let (local, _remote, r) = router(true, true, Mode::Local);
        r.initialize().await;
        assert!(r.switch_mode(Mode::Local).await);
        assert_eq!(local.probe_count(), 2);
    }

    #[tokio::test]
    async fn delegation_follows_active_adapter() {
        let (local, remote, r) = router(true, true, Mode::Remote);
        r.initialize().await;
        r.generate(GenerateRequest::new("first")).await.unwrap();
        r.switch_mode(Mode::Local).await;
        r.generate(GenerateRequest::new("second")).await.unwrap();

        assert_eq!(remote.requests()[0].prompt, "first");
        assert_eq!(local.requests()[0].prompt, "second");
    }

    #[test]
    fn status_serializes_mode_lowercase() {
        let status = RouterStatus {
            mode: Mode::Remote,
            provider: "gemini".into(),
            model: "gemini-2.0-flash-exp".into(),
            available: true,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["mode"], "remote");
    }

    #[tokio::test]
    async fn from_config_builds_both_adapters() {
        let mut config = AppConfig::default();
        config.ai_mode = Mode::Local;
        let r = EngineRouter::from_config(&config);
        assert_eq!(r.configured_mode(), Mode::Local);
        assert_eq!(r.status().await.provider, "ollama");
        assert_eq!(r.model().await, "llama3.2:3b");
    }

    #[tokio::test]
    async fn failed_recheck_of_current_mode_keeps_engine_usable() {
        let installed = Arc::new(StdMutex::new(vec!["llama3.2:3b".to_string()]));
        let app = live_tags(installed.clone()).route(
            "/api/chat",
            post(|| async { r#"{"message":{"content":"still here"},"done":true}"# }),
        );
        let base = serve(app).await;

        let mut config = AppConfig::default();
        config.ai_mode = Mode::Local;
        config.ollama.host = base;
        let r = EngineRouter::from_config(&config);
        assert!(r.initialize().await);

        // The model disappears; re-checking the active mode fails
        installed.lock().unwrap().clear();
        assert!(!r.switch_mode(Mode::Local).await);

        assert_eq!(r.mode().await, Mode::Local);
        assert!(r.is_available().await);
        assert_eq!(r.model().await, "llama3.2:3b");
        assert_eq!(
            r.generate(GenerateRequest::new("x")).await.unwrap(),
            "still here"
        );
    }

    #[tokio::test]
    async fn switch_model_targets_active_adapter() {
        let (local, remote, r) = router(true, true, Mode::Remote);
        r.initialize().await;

        assert!(r.switch_model("larger").await);
        assert_eq!(r.model().await, "larger");
        assert_eq!(remote.model().await, "larger");
        assert_eq!(local.model().await, "small");
        assert_eq!(r.mode().await, Mode::Remote);
    }

    #[tokio::test]
    async fn failed_model_switch_keeps_model() {
        let (local, _remote, r) = router(true, true, Mode::Local);
        r.initialize().await;
        local.set_reachable(false);

        assert!(!r.switch_model("missing").await);
        assert_eq!(r.model().await, "small");
        assert!(r.is_available().await);
        assert_eq!(r.mode().await, Mode::Local);
    }

    #[tokio::test]
    async fn switch_model_on_real_adapter() {
        let installed = Arc::new(StdMutex::new(vec![
            "llama3.2:3b".to_string(),
            "qwen2.5:7b".to_string(),
        ]));
        let base = serve(live_tags(installed)).await;

        let mut config = AppConfig::default();
        config.ai_mode = Mode::Local;
        config.ollama.host = base;
        config.ollama.fallback_model = "none:0b".into();
        let r = EngineRouter::from_config(&config);
        r.initialize().await;

        assert!(r.switch_model("qwen2.5:7b").await);
        assert_eq!(r.status().await.model, "qwen2.5:7b");
        assert!(!r.switch_model("phi3:mini").await);
        assert_eq!(r.status().await.model, "qwen2.5:7b");
        assert!(r.status().await.available);
    }
}
