pub mod ask;
pub mod onboard;
pub mod run;
pub mod status;
pub mod tools;

use std::path::Path;
use std::sync::Arc;

use evos_agent::PageContext;
use evos_config::AppConfig;
use evos_providers::EngineRouter;

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

/// Build the router from config and probe the engines.
pub async fn connect(config: &AppConfig) -> Arc<EngineRouter> {
    let router = Arc::new(EngineRouter::from_config(config));
    if !router.initialize().await {
        eprintln!("⚠️  No engine is available; requests will fail until one comes up");
    }
    router
}

/// Read a page context from a JSON file, or an empty context.
pub fn load_context(path: Option<&Path>) -> Result<PageContext, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(PageContext::default());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid page context in {}: {e}", path.display()))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_context_is_empty() {
        assert_eq!(load_context(None).unwrap(), PageContext::default());
    }

    #[test]
    fn context_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctx.json");
        std::fs::write(
            &path,
            r#"{"url":"https://example.com","title":"Example","interactive_elements":[{"tag":"a"}]}"#,
        )
        .unwrap();
        let ctx = load_context(Some(&path)).unwrap();
        assert_eq!(ctx.url, "https://example.com");
        assert_eq!(ctx.interactive_elements.len(), 1);
    }

    #[test]
    fn bad_context_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_context(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Invalid page context"));
    }

    #[test]
    fn unreadable_context_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_context(Some(&path)).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
        assert!(err.to_string().contains("missing.json"));
    }
}
