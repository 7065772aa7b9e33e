use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    status: String,
    primary_model: String,
    fallback_model: Option<String>,
    mock_fallback: bool,
    active_sessions: usize,
    profiles: usize,
    documents: usize,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        status: "ready".to_string(),
        primary_model: state.orchestrator.primary_model().to_string(),
        fallback_model: state.settings.llm.fallback().map(str::to_string),
        mock_fallback: state.settings.llm.mock_fallback,
        active_sessions: state.sessions.len(),
        profiles: state.profiles.len(),
        documents: state.documents.list().len(),
    })
}
