//! The EVOS agent: a step-bounded ReAct loop over a browser page.
//!
//! 1. **Build** the preamble from the page context and the tool catalogue
//! 2. **Ask** the engine router for the next decision
//! 3. **Parse** the reply into thought, action, and parameters
//! 4. **Act** through the host's executor and record the observation
//! 5. **Repeat** until the terminal action, the step budget, or `stop()`
//!
//! `QuickResponder` answers one-shot questions about the page without the loop.

pub mod callback;
pub mod prompt;
pub mod quick;
pub mod react;
pub mod task;
pub mod transcript;

pub use callback::StepCallback;
pub use quick::{QuickReply, QuickResponder};
pub use react::{AgentConfig, ReactAgent, StopHandle};
pub use task::{InteractiveElement, PageContext, Step, Task, TaskState};
pub use transcript::Transcript;
