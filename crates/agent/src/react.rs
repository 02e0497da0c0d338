//! ReAct loop: Thought → Action → Observation over a browser page.
//!
//! Each step sends the preamble and the transcript so far to the engine
//! router, parses the reply into a decision, hands the chosen action to the
//! host's executor, and folds the observation back into the transcript.
//!
//! # Termination
//!
//! - the terminal action is chosen → `completed`
//! - the step budget runs out → `error`
//! - the router returns an error → `error`
//! - `stop()` was called → `error`, observed between steps and after the last one
//!
//! A failed action marks the task `error` and the loop moves on to the next
//! step; a later step may still complete it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use evos_config::AppConfig;
use evos_core::parser;
use evos_core::provider::{GenerateRequest, ToolDefinition};
use evos_core::ToolExecutor;
use evos_providers::EngineRouter;
use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};

use crate::callback::StepCallback;
use crate::prompt::{self, PreambleLimits};
use crate::task::{PageContext, Step, Task, TaskState};
use crate::transcript::{NOT_EXECUTED, Transcript};

pub const MAX_STEPS_REASON: &str = "Max steps reached without completing task";
pub const CANCELLED_REASON: &str = "Task cancelled by user";
pub const EMPTY_TASK_REASON: &str = "Task description is empty";

/// Settings for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub max_steps: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    pub content_summary_chars: usize,
    pub max_interactive_elements: usize,
    pub terminal_action: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from(&evos_config::AgentSettings::default())
    }
}

impl From<&evos_config::AgentSettings> for AgentConfig {
    fn from(s: &evos_config::AgentSettings) -> Self {
        Self {
            max_steps: s.max_steps,
            temperature: s.temperature,
            max_tokens: s.max_tokens,
            content_summary_chars: s.content_summary_chars,
            max_interactive_elements: s.max_interactive_elements,
            terminal_action: s.terminal_action.clone(),
        }
    }
}

impl From<&AppConfig> for AgentConfig {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.agent)
    }
}

/// Cooperative stop flag shared with a running agent.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// The ReAct agent.
pub struct ReactAgent {
    router: Arc<EngineRouter>,
    config: AgentConfig,
    executor: Option<Arc<dyn ToolExecutor>>,
    tools: Vec<ToolDefinition>,
    stop: StopHandle,
    current: RwLock<Option<Task>>,
}

impl ReactAgent {
    /// Create an agent over the browser tool catalogue with default settings.
    pub fn new(router: Arc<EngineRouter>) -> Self {
        Self {
            router,
            config: AgentConfig::default(),
            executor: None,
            tools: evos_tools::definitions(),
            stop: StopHandle::default(),
            current: RwLock::new(None),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Install the host's executor. Without one, actions are recorded only.
    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Replace the tools presented to the model.
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Request cancellation of the running task.
    pub fn stop(&self) {
        info!("Stop requested");
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// A snapshot of the task in flight (or the last one run).
    pub fn current_task(&self) -> Option<Task> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn publish(&self, task: &Task) {
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(task.clone());
    }

    fn preamble(&self, context: &PageContext) -> String {
        prompt::build_preamble(
            context,
            &evos_tools::format_for_prompt(&self.tools),
            &self.config.terminal_action,
            PreambleLimits {
                content_chars: self.config.content_summary_chars,
                max_elements: self.config.max_interactive_elements,
            },
        )
    }

    /// Run one task to completion. Never fails: the outcome is in the Task.
    pub async fn run(
        &self,
        instruction: &str,
        context: PageContext,
        on_step: Option<&dyn StepCallback>,
    ) -> Task {
        self.stop.reset();
        let mut task = Task::new(instruction, context);

        if instruction.trim().is_empty() {
            task.fail(EMPTY_TASK_REASON);
            self.publish(&task);
            return task;
        }

        task.state = TaskState::Thinking;
        self.publish(&task);

        let preamble = self.preamble(&task.context);
        let mut transcript = Transcript::new(instruction);

        info!(
            task_id = %task.id,
            max_steps = self.config.max_steps,
            "ReAct loop starting"
        );

        for step_number in 1..=self.config.max_steps {
            if self.stop.is_stopped() {
                return self.cancel(task);
            }

            task.state = TaskState::Thinking;
            self.publish(&task);

            let prompt = transcript.render();
            debug!(step = step_number, prompt_chars = prompt.len(), "ReAct iteration");

            let request = GenerateRequest::new(prompt)
                .with_system(preamble.clone())
                .with_temperature(self.config.temperature)
                .with_max_tokens(self.config.max_tokens);

            let reply = self.router.generate(request).await;

            if self.stop.is_stopped() {
                return self.cancel(task);
            }

            let raw = match reply {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(step = step_number, error = %e, "Provider call failed");
                    task.fail(format!("Provider error: {e}"));
                    self.publish(&task);
                    return task;
                }
            };
            trace!(step = step_number, reply = %raw, "Model reply");

            let mut step = Step::from_reply(step_number, parser::parse_reply(&raw));

            match step.action.clone() {
                None => {
                    debug!(step = step_number, "No action in reply, asking for JSON");
                    transcript.push_correction();
                }
                Some(action) if action == self.config.terminal_action => {
                    info!(step = step_number, "Terminal action chosen");
                    let result = final_message(step.params.as_ref());
                    self.record(&mut task, step, on_step).await;
                    task.complete(result);
                    self.publish(&task);
                    info!(task_id = %task.id, steps = task.steps.len(), "ReAct loop completed");
                    return task;
                }
                Some(action) => {
                    info!(step = step_number, action = %action, "Executing action");
                    task.state = TaskState::Acting;
                    self.publish(&task);

                    match self.executor {
                        Some(ref executor) => {
                            let params = step.params.clone().unwrap_or_default();
                            step.observation = Some(match executor.execute(&action, &params).await
                            {
                                Ok(outcome) => serde_json::to_string(&outcome)
                                    .unwrap_or_else(|e| format!("Unserializable outcome: {e}")),
                                Err(e) => {
                                    warn!(step = step_number, action = %action, error = %e, "Action failed");
                                    task.state = TaskState::Error;
                                    format!("Error executing {action}: {e}")
                                }
                            });
                            transcript.push_step(&step, None);
                        }
                        None => transcript.push_step(&step, Some(NOT_EXECUTED)),
                    }
                }
            }

            self.record(&mut task, step, on_step).await;
        }

        // A stop during the last step's action or callback
        if self.stop.is_stopped() {
            return self.cancel(task);
        }

        warn!(max_steps = self.config.max_steps, "ReAct: step budget exhausted");
        task.fail(MAX_STEPS_REASON);
        self.publish(&task);
        task
    }

    /// Append a finished step and notify the callback.
    async fn record(&self, task: &mut Task, step: Step, on_step: Option<&dyn StepCallback>) {
        if let Some(callback) = on_step
            && let Err(e) = callback.on_step(&step).await
        {
            warn!(step = step.step_number, error = %e, "Step callback failed");
        }
        task.steps.push(step);
        self.publish(task);
    }

    fn cancel(&self, mut task: Task) -> Task {
        info!(task_id = %task.id, "Task cancelled");
        task.fail(CANCELLED_REASON);
        self.publish(&task);
        task
    }
}

/// The user-facing result carried by the terminal action.
fn final_message(params: Option<&Map<String, Value>>) -> String {
    match params.and_then(|p| p.get("message")) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "Task completed".into(),
        Some(other) => other.to_string(),
    }
}
