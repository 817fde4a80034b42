use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use chat_api_server::config::Settings;
use chat_api_server::router::build_router;
use chat_api_server::services::conversation::ConversationStore;
use chat_api_server::services::{CompanyDataService, ConversationOrchestrator, LlmService};
use chat_api_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,chat_api_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("🚀 Starting Chat API Server...");

    // Load configuration
    let settings = Settings::load()?;
    match Settings::config_file() {
        Some(path) => info!("✅ Configuration loaded (env={}, file={})", settings.app.env, path.display()),
        None => info!(
            "✅ Configuration loaded (env={}, no settings file, defaults + environment)",
            settings.app.env
        ),
    }

    let company = Arc::new(CompanyDataService::load(settings.company_data_path().as_deref())?);
    info!("✅ Company data ready: {}", company.get().name);

    let store = Arc::new(ConversationStore::new(
        settings.conversation.capacity(),
        settings.conversation.idle_ttl(),
    ));
    let sweeper = tokio::spawn(store.clone().run_sweeper(settings.conversation.sweep_interval()));

    let llm_service = LlmService::new(settings.llm.clone())?;
    if !llm_service.has_api_key() {
        warn!("⚠️ MISTRAL_API_KEY is not set, chat requests will fail with ENV_VAR_MISSING");
    }

    let orchestrator = Arc::new(ConversationOrchestrator::new(
        store,
        company,
        Arc::new(llm_service),
        settings.conversation.default_language.clone(),
    ));

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    let app = build_router(AppState::new(orchestrator, settings));

    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
