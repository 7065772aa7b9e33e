use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.server.body_limit_bytes;

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let api_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat_handler))
        .route("/api/sessions", get(handlers::sessions::stats_handler))
        .route("/api/sessions/{id}", delete(handlers::sessions::delete_session_handler))
        .route(
            "/api/profiles",
            post(handlers::profiles::create_profile_handler)
                .get(handlers::profiles::list_profiles_handler),
        )
        .route(
            "/api/profiles/{id}",
            get(handlers::profiles::get_profile_handler)
                .put(handlers::profiles::update_profile_handler)
                .delete(handlers::profiles::delete_profile_handler),
        )
        .route(
            "/api/profiles/{id}/status",
            post(handlers::profiles::change_status_handler),
        )
        .route(
            "/api/documents",
            post(handlers::documents::upload_handler)
                .get(handlers::documents::list_documents_handler),
        )
        .route("/api/documents/text", post(handlers::documents::ingest_text_handler))
        .route("/api/documents/query", post(handlers::documents::query_handler))
        .route(
            "/api/documents/{id}",
            delete(handlers::documents::delete_document_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        .layer(DefaultBodyLimit::max(body_limit))
}
