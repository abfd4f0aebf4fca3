use std::sync::Arc;

use pulse_config::CollectorSettings;
use pulse_registry::RegistryStore;

use crate::engine::CollectorEngine;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<CollectorSettings>,
    pub registry: Arc<RegistryStore>,
    pub engine: Arc<CollectorEngine>,
}

impl AppState {
    pub fn new(
        settings: Arc<CollectorSettings>,
        registry: Arc<RegistryStore>,
        engine: Arc<CollectorEngine>,
    ) -> Self {
        Self {
            settings,
            registry,
            engine,
        }
    }
}
