//! HTTP surface: the agent-facing server and the database API, both
//! built on axum with graceful shutdown.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{AgentServer, DbApiServer};
