//! The running record of a task, rebuilt into the prompt every step.

use serde_json::Value;

use crate::task::Step;

pub const CORRECTION: &str =
    "Your response wasn't valid JSON. Please respond with proper JSON format.";

/// Observation recorded when no executor is installed.
pub const NOT_EXECUTED: &str = "(no tool executor configured; action not executed)";

/// Append-only list of text blocks, starting with the instruction.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<String>,
}

impl Transcript {
    pub fn new(instruction: &str) -> Self {
        Self {
            entries: vec![format!(
                "User task: {instruction}\n\nBegin by analyzing the page and planning your approach."
            )],
        }
    }

    /// Record a step that took an action. `observation` overrides the step's own.
    pub fn push_step(&mut self, step: &Step, observation: Option<&str>) {
        let input = step
            .params
            .clone()
            .map(Value::Object)
            .unwrap_or_else(|| Value::Object(Default::default()));
        self.entries.push(format!(
            "Step {}:\nThought: {}\nAction: {}\nAction Input: {}\nObservation: {}",
            step.step_number,
            step.thought,
            step.action.as_deref().unwrap_or(""),
            input,
            observation.or(step.observation.as_deref()).unwrap_or(""),
        ));
    }

    pub fn push_correction(&mut self) {
        self.entries.push(CORRECTION.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The prompt text: entries separated by blank lines.
    pub fn render(&self) -> String {
        self.entries.join("\n\n")
    }
}
