use std::sync::Arc;
use tracing::{debug, info};

use crate::config::RagConfig;
use crate::models::document::{QueryRequest, QueryResponse, SourceInfo};
use crate::services::embedding_service::EmbeddingProvider;
use crate::services::orchestrator::{ChatOrchestrator, TurnInput};
use crate::services::vector_store::{ScoredChunk, VectorStore};
use crate::utils::error::ApiError;

const PREVIEW_CHARS: usize = 150;

/// Question answering over ingested documents.
pub struct RagService {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    orchestrator: Arc<ChatOrchestrator>,
    config: RagConfig,
}

impl RagService {
    pub fn new(
        store: Arc<VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        orchestrator: Arc<ChatOrchestrator>,
        config: RagConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            orchestrator,
            config,
        }
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        if self.store.is_empty() {
            return Err(ApiError::NotFound("No documents have been ingested".to_string()));
        }
        if let Some(id) = request.document_id {
            if !self.store.contains(id) {
                return Err(ApiError::NotFound(format!("Document {} not found", id)));
            }
        }

        info!("Document query: {} chars", request.question.len());

        let query_embedding = self
            .embedder
            .embed_batch(&[request.question.clone()])
            .await
            .map_err(|e| ApiError::LlmError(format!("Embedding failed: {:#}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::LlmError("No embedding returned for question".to_string()))?;

        let top_k = request.top_k.unwrap_or(self.config.top_k).max(1);
        let chunks = self.store.search(&query_embedding, request.document_id, top_k);
        debug!("Retrieved {} chunks", chunks.len());

        let context = build_context(&chunks);
        let outcome = self
            .orchestrator
            .respond(TurnInput {
                message: &request.question,
                document_context: Some(&context),
                ..TurnInput::default()
            })
            .await?;

        let sources = chunks
            .into_iter()
            .map(|chunk| SourceInfo {
                document_id: chunk.document_id,
                document_title: chunk.document_title,
                chunk_index: chunk.chunk_index,
                score: chunk.score,
                preview: chunk.content.chars().take(PREVIEW_CHARS).collect(),
            })
            .collect();

        Ok(QueryResponse {
            answer: outcome.reply,
            model: outcome.model,
            mock: outcome.mock,
            sources,
        })
    }
}

fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Source {}: {} | part {}]\n{}",
                i + 1,
                chunk.document_title,
                chunk.chunk_index + 1,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LlmConfig, PromptsConfig, WebSearchConfig};
    use crate::models::document::DocumentInfo;
    use crate::services::embedding_service::MockEmbeddingProvider;
    use crate::services::orchestrator::MockLlmProvider;
    use crate::services::prompt::PromptBuilder;
    use crate::services::vector_store::{StoredChunk, StoredDocument};
    use crate::utils::limiters::Limiters;
    use chrono::Utc;
    use uuid::Uuid;

    fn store_with_doc() -> (Arc<VectorStore>, Uuid) {
        let store = Arc::new(VectorStore::new());
        let id = Uuid::new_v4();
        store.insert(StoredDocument {
            info: DocumentInfo {
                document_id: id,
                title: "Scholarships".to_string(),
                file_type: "text/plain".to_string(),
                pages: None,
                char_count: 40,
                chunk_count: 2,
                content_hash: "h".to_string(),
                created_at: Utc::now(),
            },
            chunks: vec![
                StoredChunk {
                    index: 0,
                    content: "Merit scholarship deadline is March 1.".to_string(),
                    embedding: vec![1.0, 0.0],
                },
                StoredChunk {
                    index: 1,
                    content: "Campus dining hours.".to_string(),
                    embedding: vec![0.0, 1.0],
                },
            ],
        });
        (store, id)
    }

    fn service(store: Arc<VectorStore>, llm: MockLlmProvider) -> RagService {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed_batch()
            .returning(|_| Ok(vec![vec![1.0, 0.1]]));

        let llm_config = LlmConfig { fallback_model: String::new(), mock_fallback: false, ..LlmConfig::default() };
        let orchestrator = ChatOrchestrator::new(
            Arc::new(llm),
            PromptBuilder::new(PromptsConfig::default(), 4000),
            llm_config.clone(),
            WebSearchConfig::default(),
            Arc::new(Limiters::new(&llm_config)),
        );

        RagService::new(
            store,
            Arc::new(embedder),
            Arc::new(orchestrator),
            RagConfig { top_k: 1, ..RagConfig::default() },
        )
    }

    fn request(question: &str, document_id: Option<Uuid>) -> QueryRequest {
        QueryRequest { question: question.to_string(), document_id, top_k: None }
    }

    #[tokio::test]
    async fn test_query_uses_top_chunk_as_context() {
        let (store, _) = store_with_doc();
        let mut llm = MockLlmProvider::new();
        llm.expect_complete()
            .withf(|_, messages| {
                messages[0].content.contains("Merit scholarship deadline is March 1.")
                    && !messages[0].content.contains("Campus dining hours.")
            })
            .times(1)
            .returning(|_, _| Ok("The deadline is March 1.".to_string()));

        let response = service(store, llm)
            .query(&request("When is the scholarship deadline?", None))
            .await
            .unwrap();

        assert_eq!(response.answer, "The deadline is March 1.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].chunk_index, 0);
        assert_eq!(response.sources[0].document_title, "Scholarships");
    }

    #[tokio::test]
    async fn test_query_without_documents() {
        let service = service(Arc::new(VectorStore::new()), MockLlmProvider::new());
        let err = service.query(&request("anything", None)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_query_unknown_document() {
        let (store, _) = store_with_doc();
        let service = service(store, MockLlmProvider::new());
        let err = service
            .query(&request("anything", Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
