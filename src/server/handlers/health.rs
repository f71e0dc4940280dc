use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "time": Utc::now().to_rfc3339()
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let llm_ok = state.llm.health_check().await;
    let vector_store_ok = state.rag_store.health_check().await;
    if !vector_store_ok {
        tracing::warn!("Vector store {} unreachable", state.rag_store.name());
    }

    Ok(Json(json!({
        "llm": {
            "provider": state.llm.provider_name(),
            "model": state.llm.model(),
            "reachable": llm_ok
        },
        "vector_store": {
            "backend": state.rag_store.name(),
            "reachable": vector_store_ok
        },
        "open_sessions": state.sessions.len().await,
        "degraded": !(llm_ok && vector_store_ok)
    })))
}
