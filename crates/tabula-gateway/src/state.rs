use std::sync::Arc;

use tabula_agent::AgentRuntime;
use tabula_core::config::AppConfig;
use tabula_db::SchemaInspector;

/// Shared state for the agent-facing server.
pub struct AgentState {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
}

/// Shared state for the database API server.
pub struct DbState {
    pub inspector: SchemaInspector,
}
