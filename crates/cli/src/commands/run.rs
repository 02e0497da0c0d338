//! `evos run`: Run one task through the ReAct loop, streaming each step.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use evos_agent::{AgentConfig, ReactAgent, Step, StopHandle, TaskState};
use evos_core::Mode;
use evos_tools::ValidatingExecutor;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{connect, load_config, load_context};
use crate::bridge::StdioBridge;

pub struct RunArgs {
    pub task: String,
    pub context: Option<PathBuf>,
    pub mode: Option<Mode>,
    pub max_steps: Option<u32>,
    pub bridge: bool,
    pub json: bool,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let page = load_context(args.context.as_deref())?;

    let mut agent_config = AgentConfig::from(&config);
    if let Some(n) = args.max_steps {
        if n == 0 {
            return Err("--max-steps must be at least 1".into());
        }
        agent_config.max_steps = n;
    }

    let router = connect(&config).await;
    if let Some(mode) = args.mode
        && !router.switch_mode(mode).await
    {
        eprintln!("⚠️  Could not switch to {mode}; staying on {}", router.mode().await);
    }

    let mut agent = ReactAgent::new(router).with_config(agent_config);
    if args.bridge {
        agent = agent.with_executor(Arc::new(ValidatingExecutor::new(Arc::new(
            StdioBridge::stdio(),
        ))));
    }

    // stdout belongs to the bridge or the JSON result when either is on
    let to_stderr = args.bridge || args.json;
    let (tx, mut rx) = mpsc::channel::<Step>(16);
    let printer = tokio::spawn(async move {
        while let Some(step) = rx.recv().await {
            let line = render_step(&step);
            if to_stderr {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
    });

    let interrupt = watch_interrupt(tokio::signal::ctrl_c(), agent.stop_handle());
    let task = agent.run(&args.task, page, Some(&tx)).await;
    interrupt.abort();
    drop(tx);
    printer.await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&task)?);
    } else if task.state == TaskState::Completed {
        println!("\n✅ {}", task.result.as_deref().unwrap_or_default());
    } else {
        println!("\n❌ {}", task.error.as_deref().unwrap_or("Task failed"));
    }

    Ok(())
}

/// Stop the agent once `signal` fires. The loop ends at its next step boundary.
fn watch_interrupt<F>(signal: F, stop: StopHandle) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if signal.await.is_ok() {
            eprintln!("\n⏹  Interrupted, stopping after the current step");
            stop.stop();
        }
    })
}

fn render_step(step: &Step) -> String {
    let mut out = format!("💭 Step {}: {}", step.step_number, step.thought);
    if let Some(action) = &step.action {
        let params = step
            .params
            .clone()
            .map(serde_json::Value::Object)
            .unwrap_or_default();
        out.push_str(&format!("\n   🔧 {action} {params}"));
    }
    if let Some(observation) = &step.observation {
        out.push_str(&format!("\n   👁  {observation}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(n: u32, action: Option<&str>, observation: Option<&str>) -> Step {
        let mut step: Step = serde_json::from_value(serde_json::json!({
            "step_number": n,
            "thought": "looking",
            "timestamp": "2026-01-01T00:00:00Z",
        }))
        .unwrap();
        step.action = action.map(String::from);
        step.params = action.map(|_| serde_json::Map::new());
        step.observation = observation.map(String::from);
        step
    }

    #[test]
    fn thought_only_step() {
        assert_eq!(render_step(&make(1, None, None)), "💭 Step 1: looking");
    }

    #[tokio::test]
    async fn interrupt_stops_the_agent() {
        let stop = StopHandle::default();
        watch_interrupt(std::future::ready(Ok(())), stop.clone())
            .await
            .unwrap();
        assert!(stop.is_stopped());
    }

    #[tokio::test]
    async fn failed_signal_listener_leaves_agent_running() {
        let stop = StopHandle::default();
        let failed = std::future::ready(Err(std::io::Error::other("no signal support")));
        watch_interrupt(failed, stop.clone()).await.unwrap();
        assert!(!stop.is_stopped());
    }

    #[test]
    fn action_step_shows_observation() {
        let out = render_step(&make(2, Some("scroll"), Some("ok")));
        assert!(out.contains("🔧 scroll {}"));
        assert!(out.ends_with("👁  ok"));
    }
}
