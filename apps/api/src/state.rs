use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::catalog::ReferenceData;
use crate::survey::scorer::SurveyScorer;
use crate::survey::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable scorer. Default: LocalSurveyScorer. Swap via SCORING_MODE env.
    pub scorer: Arc<dyn SurveyScorer>,
    pub sessions: SessionStore,
    /// Jobs, details and tracks, fetched once from the scorer on first use.
    reference: Arc<RwLock<Option<Arc<ReferenceData>>>>,
}

impl AppState {
    pub fn new(config: Config, scorer: Arc<dyn SurveyScorer>) -> Self {
        Self {
            sessions: SessionStore::new(config.session_ttl),
            config,
            scorer,
            reference: Arc::new(RwLock::new(None)),
        }
    }

    /// Cached reference data. A failed load is not cached, so the next
    /// request tries again.
    pub async fn reference(&self) -> Result<Arc<ReferenceData>, AppError> {
        if let Some(cached) = self.reference.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.reference.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }
        let loaded = Arc::new(self.scorer.reference_data().await?);
        info!(
            "Loaded reference data from {} backend: {} jobs, {} tracks",
            self.scorer.backend(),
            loaded.jobs.len(),
            loaded.career_tracks.len()
        );
        *slot = Some(loaded.clone());
        Ok(loaded)
    }
}
