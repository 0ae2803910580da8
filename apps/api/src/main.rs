mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod portfolio;
mod render;
mod routes;
mod state;
mod storage;
mod template;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::generation::generator::{GenerationOrchestrator, OrchestratorSettings};
use crate::generation::prompts::PromptLibrary;
use crate::llm_client::HttpLlmFactory;
use crate::portfolio::Portfolio;
use crate::render::PdfLatexRenderer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::PgResumeStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await.context("Database migration failed")?;
    let store = Arc::new(PgResumeStore::new(db));

    // Portfolio and prompts are read once; a bad file stops startup
    let portfolio = Portfolio::load(&config.portfolio_path)
        .with_context(|| format!("Failed to load portfolio {}", config.portfolio_path.display()))?;
    let prompts = PromptLibrary::load(config.prompts_dir.as_deref())?;
    info!("Portfolio loaded from {}", config.portfolio_path.display());

    let llm = HttpLlmFactory::new(&config)?;
    info!("LLM providers available: {:?}", llm.available_providers());

    let renderer = PdfLatexRenderer::new(&config.latex_program, config.render_timeout);

    let orchestrator = GenerationOrchestrator::new(
        store.clone(),
        Arc::new(renderer),
        Arc::new(llm),
        Arc::new(portfolio),
        Arc::new(prompts),
        OrchestratorSettings {
            output_root: config.output_dir.clone(),
            resume_template_id: config.resume_template_id,
            cover_letter_template_id: config.cover_letter_template_id,
            fallback: config.verbatim_fallback,
            llm_timeout: config.llm_timeout,
            clearance_guard: config.clearance_guard.clone(),
        },
    );

    // Build app state
    let state = AppState {
        store,
        orchestrator: Arc::new(orchestrator),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
