//! Inference engines for EVOS.
//!
//! Both adapters implement the `evos_core::Provider` trait.
//! The router owns one of each and delegates to whichever is active.

mod http;
pub mod local;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod remote;
pub mod router;

pub use local::OllamaProvider;
#[cfg(any(test, feature = "mock"))]
pub use mock::ScriptedProvider;
pub use remote::GeminiProvider;
pub use router::{EngineRouter, RouterStatus};
