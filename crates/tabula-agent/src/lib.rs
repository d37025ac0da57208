//! Database agent: read-only schema tools plus the LLM loop that drives
//! them from natural-language questions.

pub mod prompts;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod tools;

pub use registry::ToolRegistry;
pub use runtime::{parse_reply, AgentRuntime};
pub use session::SessionStore;
