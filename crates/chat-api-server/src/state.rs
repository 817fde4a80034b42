use std::sync::Arc;
use axum::extract::FromRef;

use crate::config::Settings;
use crate::services::ConversationOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub settings: Settings,
}

impl AppState {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>, settings: Settings) -> Self {
        Self { orchestrator, settings }
    }
}

impl FromRef<AppState> for Arc<ConversationOrchestrator> {
    fn from_ref(state: &AppState) -> Self {
        state.orchestrator.clone()
    }
}
