use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::handlers::AppJson;
use crate::models::chat::{ApiResponse, ChatMessage, ChatReply, ChatRequest, ClearResponse};
use crate::services::ConversationOrchestrator;
use crate::state::AppState;
use crate::utils::error::ApiError;

pub async fn chat_handler(
    State(state): State<AppState>,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, ApiError> {
    // Blank check only; the model gets the message as sent
    let message = request
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Message is required".to_string()))?;

    info!(
        "Chat request: conversation={}, message_len={}",
        request.conversation_id.as_deref().unwrap_or("<new>"),
        message.len()
    );

    let reply = state
        .orchestrator
        .send_message(message, request.conversation_id.as_deref())
        .await
        .map_err(|e| ApiError::chat(e, state.settings.app.is_development()))?;

    Ok(Json(ApiResponse::ok(reply)))
}

pub async fn history_handler(
    State(orchestrator): State<Arc<ConversationOrchestrator>>,
    Path(conversation_id): Path<String>,
) -> Json<ApiResponse<Vec<ChatMessage>>> {
    let history = orchestrator.get_history(&conversation_id);
    debug!("History for {}: {} messages", conversation_id, history.len());
    Json(ApiResponse::ok(history))
}

pub async fn clear_handler(
    State(orchestrator): State<Arc<ConversationOrchestrator>>,
    Path(conversation_id): Path<String>,
) -> Json<ApiResponse<ClearResponse>> {
    let cleared = orchestrator.clear_conversation(&conversation_id).await;
    info!("Clear conversation {}: cleared={}", conversation_id, cleared);
    Json(ApiResponse::ok(ClearResponse { cleared }))
}
