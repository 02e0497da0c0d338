//! Browser tools for EVOS.
//!
//! The agent chooses among these actions; the host carries them out by
//! driving a page. This crate only declares them, formats them for prompts,
//! validates parameters, and wraps chosen actions in the command envelope.

pub mod catalogue;
pub mod command;

pub use catalogue::{
    ANSWER_USER, BrowserTool, ParamSpec, ToolKind, catalogue, definitions, find, format_for_prompt,
    validate_parameters,
};
pub use command::{BrowserCommand, ValidatingExecutor};
