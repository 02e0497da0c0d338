//! A scripted provider for tests: replays queued replies in order.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use evos_core::provider::{GenerateRequest, Provider};
use evos_core::ProviderError;

/// Replays a queue of replies and records every request it receives.
pub struct ScriptedProvider {
    name: String,
    model: Mutex<String>,
    probe_ok: AtomicBool,
    available: AtomicBool,
    probes: AtomicUsize,
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedProvider {
    /// A provider whose probe succeeds and whose replies are all `Ok`.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    /// A provider replaying arbitrary results, errors included.
    pub fn with_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<String, ProviderError>>,
    {
        Self {
            name: "scripted".into(),
            model: Mutex::new("scripted-model".into()),
            probe_ok: AtomicBool::new(true),
            available: AtomicBool::new(false),
            probes: AtomicUsize::new(0),
            replies: Mutex::new(results.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(self, model: impl Into<String>) -> Self {
        *lock(&self.model) = model.into();
        self
    }

    /// Whether `initialize` and `switch_model` should succeed.
    pub fn with_probe(self, ok: bool) -> Self {
        self.set_reachable(ok);
        self
    }

    /// Change the outcome of later health checks.
    pub fn set_reachable(&self, ok: bool) {
        self.probe_ok.store(ok, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), ProviderError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProviderError::Network(format!("{} is unreachable", self.name)))
        }
    }

    /// Queue another reply.
    pub fn push(&self, reply: Result<String, ProviderError>) {
        lock(&self.replies).push_back(reply);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        lock(&self.requests).clone()
    }

    /// How many health checks ran, from `initialize` or `switch_model`.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn model(&self) -> String {
        lock(&self.model).clone()
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> Result<(), ProviderError> {
        self.check()?;
        self.available.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn switch_model(&self, model: &str) -> Result<(), ProviderError> {
        self.check()?;
        *lock(&self.model) = model.to_string();
        self.available.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ProviderError> {
        lock(&self.requests).push(request);
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| {
                Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "script exhausted".into(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_in_order_then_errors() {
        let provider = ScriptedProvider::new(["one", "two"]);
        assert_eq!(provider.generate(GenerateRequest::new("a")).await.unwrap(), "one");
        assert_eq!(provider.generate(GenerateRequest::new("b")).await.unwrap(), "two");
        assert!(matches!(
            provider.generate(GenerateRequest::new("c")).await,
            Err(ProviderError::ApiError { status_code: 500, .. })
        ));
        assert_eq!(provider.requests().len(), 3);
        assert_eq!(provider.requests()[1].prompt, "b");
    }

    #[tokio::test]
    async fn scripted_errors_are_returned() {
        let provider = ScriptedProvider::with_results([
            Err(ProviderError::Timeout("slow".into())),
            Ok("after".into()),
        ]);
        assert!(provider.generate(GenerateRequest::new("x")).await.is_err());
        assert_eq!(provider.remaining(), 1);
    }

    #[tokio::test]
    async fn probe_result_is_configurable() {
        let provider = ScriptedProvider::new(Vec::<String>::new()).with_probe(false);
        assert!(provider.initialize().await.is_err());
        assert!(!provider.is_available().await);
        assert_eq!(provider.probe_count(), 1);
    }

    #[tokio::test]
    async fn refused_check_keeps_earlier_success() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        provider.initialize().await.unwrap();
        provider.set_reachable(false);
        assert!(provider.initialize().await.is_err());
        assert!(provider.switch_model("other").await.is_err());
        assert!(provider.is_available().await);
        assert_eq!(provider.model().await, "scripted-model");
    }
}
