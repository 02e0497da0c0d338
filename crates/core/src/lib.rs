//! # EVOS Core
//!
//! Domain types, traits, and error definitions for the EVOS browser agent.
//! This crate has **no transport dependencies**: it defines the contracts
//! that the provider adapters, the tool catalogue, and the agent loop
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait here. Implementations live in their respective
//! crates. This enables:
//! - Swapping the local and remote model backends at runtime
//! - Testing the agent loop with scripted providers and executors
//! - A clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod mode;
pub mod parser;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use mode::Mode;
pub use parser::{ParsedReply, ToolReply};
pub use provider::{GenerateRequest, Provider, TextStream, ToolDefinition};
pub use tool::{ToolExecutor, ToolOutcome};
