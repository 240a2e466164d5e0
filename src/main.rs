use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use bioethics_ai::{AiConfig, AiEnv, build_completer};
use bioethics_core::{
    CoreConfig, FileCaseStore, KnowledgeBase, SessionServices,
    config::{case_data_dir_from_env_value, knowledge_base_path_from_env_value},
};

/// Main entry point for the bioethics deliberation service
///
/// Resolves configuration once, wires the case store, knowledge base and AI
/// provider into the shared session services, then serves the REST API with
/// OpenAPI/Swagger UI.
///
/// # Environment Variables
/// - `BIOETHICS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `BIOETHICS_DATA_DIR`: Directory for case storage (default: "case_data")
/// - `BIOETHICS_KNOWLEDGE_BASE`: Optional dilemma knowledge base override
/// - `AI_PROVIDER`, `AI_API_KEY`/`GEMINI_API_KEY`, `AI_MODEL`, `AI_BASE_URL`,
///   `AI_TIMEOUT_SECS`: AI provider settings; AI features are disabled without a key
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration values are invalid or the knowledge base cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bioethics_run=info".parse()?)
                .add_directive("bioethics_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("BIOETHICS_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()?;

    let cfg = Arc::new(CoreConfig::new(
        case_data_dir_from_env_value(std::env::var("BIOETHICS_DATA_DIR").ok()),
        knowledge_base_path_from_env_value(std::env::var("BIOETHICS_KNOWLEDGE_BASE").ok()),
    )?);
    tracing::info!("++ Case data directory: {}", cfg.case_data_dir().display());

    let knowledge_base = KnowledgeBase::load(cfg.knowledge_base_path())?;
    let ai_cfg = AiConfig::from_env(AiEnv::from_process_env())?;
    let completer = build_completer(&ai_cfg)?;

    let state = AppState::new(SessionServices {
        store: Arc::new(FileCaseStore::new(cfg)),
        knowledge_base: Arc::new(knowledge_base),
        completer,
    });

    tracing::info!("++ Starting bioethics REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
