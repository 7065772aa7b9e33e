use crate::handlers::extract::AppJson;
use crate::models::chat::{ChatRequest, ChatResponse};
use crate::services::orchestrator::TurnInput;
use crate::services::{ChatOrchestrator, DocumentService, ProfileStore, SessionTracker};
use crate::utils::error::ApiError;
use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use validator::Validate;

pub async fn chat_handler(
    State(orchestrator): State<Arc<ChatOrchestrator>>,
    State(sessions): State<SessionTracker>,
    State(profiles): State<Arc<ProfileStore>>,
    AppJson(request): AppJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let start_time = Instant::now();
    request.validate()?;

    let session_id = SessionTracker::resolve_id(request.session_id.as_deref())?;

    info!(
        "Chat request: session={}, message_len={}, history={}, profile={:?}, attachments={}, web_search={}",
        session_id,
        request.message.len(),
        request.history.len(),
        request.profile_id,
        request.attachments.len(),
        request.web_search
    );

    let profile = request
        .profile_id
        .map(|id| profiles.get_for_chat(id))
        .transpose()?;

    let attachment_context = DocumentService::extract_attachments(&request.attachments)?;
    let document_context = [request.document_context.as_deref(), attachment_context.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let session = sessions.touch(&session_id);

    let outcome = orchestrator
        .respond(TurnInput {
            message: &request.message,
            history: &request.history,
            profile: profile.as_ref(),
            document_context: (!document_context.is_empty()).then_some(document_context.as_str()),
            web_search: request.web_search,
        })
        .await?;

    let processing_time_ms = start_time.elapsed().as_millis() as u64;
    info!(
        "Chat completed: session={}, model={}, fallback={}, mock={}, {}ms",
        session_id, outcome.model, outcome.fallback_used, outcome.mock, processing_time_ms
    );

    Ok(Json(ChatResponse {
        reply: outcome.reply,
        session_id,
        model: outcome.model,
        fallback_used: outcome.fallback_used,
        mock: outcome.mock,
        web_search: outcome.web_search,
        attempts: outcome.attempts,
        message_count: session.message_count,
        processing_time_ms,
    }))
}
