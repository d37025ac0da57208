use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tabula_agent::{AgentRuntime, SessionStore, ToolRegistry};
use tabula_core::config::AppConfig;
use tabula_core::types::SessionId;
use tabula_db::SchemaInspector;
use tabula_gateway::{AgentServer, DbApiServer};

#[derive(Parser)]
#[command(name = "tabula", version, about = "Database agent and Excel report service")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "tabula.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent server and the database API
    Serve,
    /// Run a single question through the agent and print the reply
    Ask {
        /// The question to send
        #[arg(trailing_var_arg = true)]
        question: Vec<String>,

        /// Session ID (auto-generated if not provided)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Show the resolved configuration
    Config,
    /// Create and populate the demo `users` table
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tabula=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Ask { question, session } => ask(config, question, session).await,
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Seed => {
            let pool = tabula_db::connect(&config.database).await?;
            tabula_db::seed_demo_data(&pool).await?;
            Ok(())
        }
    }
}

async fn build_runtime(config: &AppConfig) -> anyhow::Result<(Arc<AgentRuntime>, SchemaInspector)> {
    let pool = tabula_db::connect(&config.database).await?;
    let inspector = SchemaInspector::new(pool);

    let llm: Arc<dyn tabula_core::traits::LlmClient> =
        Arc::from(tabula_llm::create_client(&config.model));
    let registry = Arc::new(ToolRegistry::with_database_tools(
        inspector.clone(),
        config.agent.default_sample_limit,
    ));
    let store = Arc::new(SessionStore::new());
    let runtime = Arc::new(AgentRuntime::new(config.clone(), llm, registry, store));
    Ok((runtime, inspector))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let (runtime, inspector) = build_runtime(&config).await?;

    let cancel = tokio_util::sync::CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutting down...");
        cancel_clone.cancel();
    });

    let db_server = DbApiServer::new(config.api.bind.clone(), inspector);
    let agent_server = AgentServer::new(config, runtime);

    let db_cancel = cancel.clone();
    let db_task = tokio::spawn(async move { db_server.run(db_cancel).await });

    agent_server.run(cancel).await?;
    db_task.await??;
    Ok(())
}

async fn ask(config: AppConfig, question: Vec<String>, session: Option<String>) -> anyhow::Result<()> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        anyhow::bail!("no question given");
    }

    let (runtime, _inspector) = build_runtime(&config).await?;
    let session_id = session
        .as_deref()
        .map(SessionId::from_string)
        .unwrap_or_default();

    let reply = runtime.run(&session_id, &question).await?;
    println!("[{:?}] {}", reply.status, reply.message);
    Ok(())
}
