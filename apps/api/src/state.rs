use std::sync::Arc;

use crate::generation::generator::GenerationOrchestrator;
use crate::storage::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ResumeStore>,
    pub orchestrator: Arc<GenerationOrchestrator>,
}
