use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::graph::ProgressSink;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub collection: String,
    pub query: String,
}

/// Run the research workflow to completion and return the report.
pub async fn run_research(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let agent = state.agent_for(&request.collection).await?;
    let report = agent.run(&request.query, ProgressSink::disabled()).await?;

    Ok(Json(json!({
        "collection": request.collection,
        "report": report
    })))
}
