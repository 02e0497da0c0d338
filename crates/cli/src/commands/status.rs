//! `evos status`: Probe the engines and show the active one.

use evos_config::AppConfig;

use super::{connect, load_config};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let router = connect(&config).await;
    let status = router.status().await;

    println!("🧭 EVOS Status");
    println!("==============");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Configured:   {}", router.configured_mode());
    println!("  Active mode:  {}", status.mode);
    println!("  Provider:     {}", status.provider);
    println!("  Model:        {}", status.model);
    println!("  Ollama host:  {}", config.ollama.host);
    println!("  Gemini key:   {}", if config.has_api_key() { "set" } else { "not set" });
    println!("  Max steps:    {}", config.agent.max_steps);

    if status.available {
        println!("\n  ✅ Engine ready");
    } else {
        println!("\n  ❌ No engine available");
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, run `evos onboard` first");
    }

    Ok(())
}
