use std::sync::Arc;

use episodic_core::{
    AcquisitionOrchestrator, Config, EpisodeStore, SanitizedConfig, ShowRegistry,
};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<AcquisitionOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<AcquisitionOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &AcquisitionOrchestrator {
        self.orchestrator.as_ref()
    }

    pub fn store(&self) -> &dyn EpisodeStore {
        self.orchestrator.context().store.as_ref()
    }

    pub fn shows(&self) -> &ShowRegistry {
        self.orchestrator.context().shows.as_ref()
    }
}
