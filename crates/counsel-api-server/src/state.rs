use anyhow::Result;
use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::services::embedding_service::{EmbeddingProvider, LimitedEmbedder};
use crate::services::orchestrator::LlmProvider;
use crate::services::prompt::PromptBuilder;
use crate::services::{
    ChatOrchestrator, DocumentService, EmbeddingService, LlmService, ProfileStore, RagService,
    SessionTracker, VectorStore,
};
use crate::utils::limiters::Limiters;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub sessions: SessionTracker,
    pub profiles: Arc<ProfileStore>,
    pub documents: Arc<DocumentService>,
    pub rag_service: Arc<RagService>,
}

impl AppState {
    /// Wire services against the real HTTP providers.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let llm: Arc<dyn LlmProvider> = Arc::new(LlmService::new(settings.llm.clone())?);
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(EmbeddingService::new(settings.embedding.clone())?);
        Ok(Self::with_providers(settings, llm, embedder))
    }

    pub fn with_providers(
        settings: Settings,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let limiters = Arc::new(Limiters::new(&settings.llm));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(LimitedEmbedder::new(embedder, limiters.clone()));

        let orchestrator = Arc::new(ChatOrchestrator::new(
            llm,
            PromptBuilder::new(settings.prompts.clone(), settings.rag.max_context_chars),
            settings.llm.clone(),
            settings.web_search.clone(),
            limiters,
        ));

        let store = Arc::new(VectorStore::new());
        let documents = Arc::new(DocumentService::new(store.clone(), embedder.clone(), &settings.rag));
        let rag_service = Arc::new(RagService::new(
            store,
            embedder,
            orchestrator.clone(),
            settings.rag.clone(),
        ));

        Self {
            sessions: SessionTracker::new(Duration::from_secs(settings.session.idle_ttl_seconds)),
            profiles: Arc::new(ProfileStore::new()),
            settings: Arc::new(settings),
            orchestrator,
            documents,
            rag_service,
        }
    }
}

impl FromRef<AppState> for Arc<ChatOrchestrator> {
    fn from_ref(state: &AppState) -> Self {
        state.orchestrator.clone()
    }
}

impl FromRef<AppState> for SessionTracker {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<ProfileStore> {
    fn from_ref(state: &AppState) -> Self {
        state.profiles.clone()
    }
}

impl FromRef<AppState> for Arc<DocumentService> {
    fn from_ref(state: &AppState) -> Self {
        state.documents.clone()
    }
}

impl FromRef<AppState> for Arc<RagService> {
    fn from_ref(state: &AppState) -> Self {
        state.rag_service.clone()
    }
}
