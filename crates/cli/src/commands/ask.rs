//! `evos ask`: One-shot reply about the page.

use std::path::PathBuf;

use evos_agent::{QuickReply, QuickResponder};

use super::{connect, load_config, load_context};

pub async fn run(message: String, context: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let page = load_context(context.as_deref())?;
    let router = connect(&config).await;

    let reply = QuickResponder::new(router)
        .respond(&message, &page)
        .await
        .map_err(|e| format!("Request failed: {e}"))?;

    match reply {
        QuickReply::Text { message } => println!("{message}"),
        QuickReply::Command {
            command,
            params,
            message,
        } => {
            if !message.is_empty() {
                println!("{message}");
            }
            println!("🔧 {command} {}", serde_json::Value::Object(params));
        }
    }
    Ok(())
}
