use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::schemas::{
    ChatRequest, ChatResponse, ClearResponse, ConversationHistoryResponse, HealthResponse,
    ToolsResponse,
};
use crate::state::AppState;

pub const ROOT_PATH: &str = "/";
pub const HEALTH_PATH: &str = "/health";
pub const CHAT_PATH: &str = "/chat";
pub const CONVERSATION_PATH: &str = "/conversation/:thread_id";
pub const TOOLS_PATH: &str = "/tools";

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build every route on one router
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(ROOT_PATH, get(root))
        .route(HEALTH_PATH, get(health))
        .route(CHAT_PATH, post(chat))
        .route(
            CONVERSATION_PATH,
            get(get_conversation).delete(clear_conversation),
        )
        .route(TOOLS_PATH, get(tools))
}

fn health_body(ready: bool) -> HealthResponse {
    HealthResponse {
        status: "healthy".to_string(),
        agent_ready: ready,
        version: VERSION.to_string(),
    }
}

async fn root(State(st): State<AppState>) -> Json<HealthResponse> {
    Json(health_body(st.is_ready()))
}

async fn health(State(st): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if !st.is_ready() {
        return Err(ApiError::NotReady("Agent is not initialized".to_string()));
    }
    Ok(Json(health_body(true)))
}

async fn chat(
    State(st): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    req.validate()?;

    let agent = st.agent()?;
    debug!("POST /chat thread={}", req.thread_id);

    let outcome = agent
        .chat(&req.message, &req.thread_id)
        .await
        .map_err(|e| ApiError::Internal(format!("Error processing message: {}", e)))?;
    Ok(Json(outcome.into()))
}

async fn get_conversation(
    State(st): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<ConversationHistoryResponse>, ApiError> {
    let agent = st.agent()?;
    let messages = agent.get_conversation_history(&thread_id).await;
    Ok(Json(ConversationHistoryResponse {
        message_count: messages.len(),
        thread_id,
        messages,
    }))
}

async fn clear_conversation(
    State(st): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let agent = st.agent()?;
    let removed = agent
        .clear_conversation(&thread_id)
        .await
        .map_err(|e| ApiError::Internal(format!("Error clearing conversation: {}", e)))?;
    info!("DELETE /conversation/{} (had history: {})", thread_id, removed);

    Ok(Json(ClearResponse {
        message: format!("Conversation {} cleared successfully", thread_id),
    }))
}

async fn tools(State(st): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: st.catalog(),
    })
}
