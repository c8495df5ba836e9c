use std::sync::Arc;

use filesearch_backend::orchestrator::Orchestrator;

/// Shared application state / 共享应用状态
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}
