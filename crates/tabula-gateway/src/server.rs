use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use tabula_agent::AgentRuntime;
use tabula_core::config::AppConfig;
use tabula_db::SchemaInspector;

use crate::routes;
use crate::state::{AgentState, DbState};

/// The agent-facing HTTP server: natural-language queries and report
/// generation.
pub struct AgentServer {
    config: AppConfig,
    runtime: Arc<AgentRuntime>,
}

impl AgentServer {
    pub fn new(config: AppConfig, runtime: Arc<AgentRuntime>) -> Self {
        Self { config, runtime }
    }

    /// Run until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let bind = self.config.gateway.bind.clone();
        let state = Arc::new(AgentState {
            config: self.config.clone(),
            runtime: self.runtime.clone(),
        });

        let app = Router::new()
            .route("/api/health", get(routes::health))
            .route("/api/query", post(routes::query))
            .route("/api/query/stream", post(routes::query_stream))
            .route("/api/reports", post(routes::create_report))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener = TcpListener::bind(&bind).await?;
        info!(bind = %bind, "agent server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("agent server shut down");
        Ok(())
    }
}

/// The database inspection API the tools and external callers share.
pub struct DbApiServer {
    bind: String,
    inspector: SchemaInspector,
}

impl DbApiServer {
    pub fn new(bind: String, inspector: SchemaInspector) -> Self {
        Self { bind, inspector }
    }

    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(DbState {
            inspector: self.inspector.clone(),
        });

        let app = Router::new()
            .route("/", get(routes::db_health))
            .route("/db/tables", get(routes::list_tables))
            .route("/db/schema", get(routes::schema))
            .route("/db/{table}/samples", get(routes::samples))
            .route("/db/{table}/summary", get(routes::summary))
            .route("/db/{table}/uniques", get(routes::uniques))
            .route("/db/query", post(routes::run_query))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener = TcpListener::bind(&self.bind).await?;
        info!(bind = %self.bind, "database api listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("database api shut down");
        Ok(())
    }
}
