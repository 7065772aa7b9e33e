use crate::handlers::extract::AppPath;
use crate::services::session_tracker::SessionStats;
use crate::services::SessionTracker;
use crate::utils::error::ApiError;
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

pub async fn stats_handler(State(sessions): State<SessionTracker>) -> Json<SessionStats> {
    Json(sessions.stats())
}

pub async fn delete_session_handler(
    State(sessions): State<SessionTracker>,
    AppPath(session_id): AppPath<String>,
) -> Result<StatusCode, ApiError> {
    if sessions.remove(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Session {} not found", session_id)))
    }
}
