mod backend_client;
mod config;
mod errors;
mod models;
mod routes;
mod state;
mod survey;

#[cfg(test)]
mod test_support;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::backend_client::BackendClient;
use crate::config::{Config, ScoringMode};
use crate::models::catalog::Catalog;
use crate::routes::build_router;
use crate::state::AppState;
use crate::survey::scorer::{LocalSurveyScorer, RemoteSurveyScorer, SurveyScorer};

const SESSION_SWEEP_SECS: u64 = 60;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting InferDev API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize scorer (LocalSurveyScorer by default, swap via SCORING_MODE)
    let scorer = build_scorer(&config)?;
    info!(
        "Scoring backend: {} (default flow {:?})",
        scorer.backend(),
        config.survey_flow
    );

    let state = AppState::new(config.clone(), scorer);

    // Drop abandoned surveys in the background
    let sweep_every = config.session_ttl.min(Duration::from_secs(SESSION_SWEEP_SECS));
    state.sessions.spawn_sweeper(sweep_every);
    info!(
        "Survey sessions expire after {}s idle (sweep every {}s)",
        config.session_ttl.as_secs(),
        sweep_every.as_secs()
    );

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the scorer selected by `SCORING_MODE`.
fn build_scorer(config: &Config) -> Result<Arc<dyn SurveyScorer>> {
    match config.scoring_mode {
        ScoringMode::Local => {
            let catalog = Catalog::from_path(&config.catalog_path)?;
            Ok(Arc::new(LocalSurveyScorer::new(catalog)))
        }
        ScoringMode::Remote => {
            let base_url = config
                .backend_api_url
                .as_deref()
                .context("BACKEND_API_URL is required for remote scoring")?;
            let client = BackendClient::new(
                base_url,
                config.backend_token.clone(),
                config.backend_timeout,
            )
            .context("Failed to build the backend HTTP client")?;
            info!("Remote scoring against {}", client.base_url());
            Ok(Arc::new(RemoteSurveyScorer(client)))
        }
    }
}
