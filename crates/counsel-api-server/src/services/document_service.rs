use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document::{DocumentParser, ParsedDocument, TextChunker};
use crate::models::chat::Attachment;
use crate::models::document::DocumentInfo;
use crate::services::embedding_service::EmbeddingProvider;
use crate::services::vector_store::{StoredChunk, StoredDocument, VectorStore};
use crate::utils::error::ApiError;

/// Max attachments accepted on a single chat turn.
pub const MAX_ATTACHMENTS: usize = 5;

pub struct DocumentService {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentService {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn EmbeddingProvider>, config: &RagConfig) -> Self {
        Self {
            store,
            embedder,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }

    /// Uploaded file: parse -> chunk -> embed -> store.
    pub async fn process_upload(
        &self,
        file_name: &str,
        title: Option<&str>,
        bytes: &[u8],
    ) -> Result<(DocumentInfo, bool), ApiError> {
        info!("Processing upload: {} ({} bytes)", file_name, bytes.len());

        let parsed = DocumentParser::parse_bytes(file_name, bytes)
            .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?;

        self.ingest(title.unwrap_or(file_name), parsed).await
    }

    /// Raw text submitted directly by the client.
    pub async fn ingest_text(&self, title: &str, text: &str) -> Result<(DocumentInfo, bool), ApiError> {
        let parsed = DocumentParser::parse_bytes(&format!("{}.txt", title), text.as_bytes())
            .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?;
        self.ingest(title, parsed).await
    }

    async fn ingest(&self, title: &str, parsed: ParsedDocument) -> Result<(DocumentInfo, bool), ApiError> {
        let content_hash = hex::encode(Sha256::digest(parsed.content.as_bytes()));
        if let Some(existing) = self.store.find_by_hash(&content_hash) {
            info!("Document {} already ingested as {}", title, existing.document_id);
            return Ok((existing, false));
        }

        let chunker = TextChunker::new(self.chunk_size, self.chunk_overlap)?;
        let chunks = chunker.chunk(&parsed.content);
        debug!("Created {} chunks for {}", chunks.len(), title);

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| ApiError::LlmError(format!("Embedding failed: {:#}", e)))?;

        if embeddings.len() != chunks.len() {
            return Err(ApiError::LlmError(format!(
                "Embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                embeddings.len()
            )));
        }

        let stored_chunks: Vec<StoredChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredChunk {
                index: chunk.index,
                content: chunk.content,
                embedding,
            })
            .collect();

        let info = DocumentInfo {
            document_id: Uuid::new_v4(),
            title: title.trim().to_string(),
            file_type: parsed.kind.mime().to_string(),
            pages: parsed.pages,
            char_count: parsed.content.chars().count(),
            chunk_count: stored_chunks.len(),
            content_hash,
            created_at: Utc::now(),
        };

        let (info, created) = self.store.insert(StoredDocument {
            info,
            chunks: stored_chunks,
        });
        if created {
            info!("Stored document {} with {} chunks", info.document_id, info.chunk_count);
        }
        Ok((info, created))
    }

    pub fn list(&self) -> Vec<DocumentInfo> {
        self.store.list()
    }

    pub fn delete(&self, document_id: Uuid) -> Result<(), ApiError> {
        if self.store.remove(document_id) {
            info!("Deleted document {}", document_id);
            Ok(())
        } else {
            Err(ApiError::NotFound(format!("Document {} not found", document_id)))
        }
    }

    /// Decode and parse chat attachments into one context block.
    /// Nothing is stored.
    pub fn extract_attachments(attachments: &[Attachment]) -> Result<Option<String>, ApiError> {
        if attachments.is_empty() {
            return Ok(None);
        }
        if attachments.len() > MAX_ATTACHMENTS {
            return Err(ApiError::BadRequest(format!(
                "At most {} attachments are allowed per message",
                MAX_ATTACHMENTS
            )));
        }

        let mut sections = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let bytes = decode_base64(&attachment.file_base64).map_err(|e| {
                warn!("Failed to decode base64 for {}: {}", attachment.file_name, e);
                ApiError::BadRequest(format!("Invalid base64 in {}: {}", attachment.file_name, e))
            })?;

            let parsed = DocumentParser::parse_bytes(&attachment.file_name, &bytes)
                .map_err(|e| ApiError::BadRequest(format!("{:#}", e)))?;

            sections.push(format!("[{}]\n{}", attachment.file_name, parsed.content));
        }

        Ok(Some(sections.join("\n\n")))
    }
}

/// Accepts bare base64 or a `data:<mime>;base64,` URL.
fn decode_base64(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match input.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => input,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding_service::MockEmbeddingProvider;

    fn service(embedder: MockEmbeddingProvider) -> DocumentService {
        let config = RagConfig { chunk_size: 20, chunk_overlap: 5, ..RagConfig::default() };
        DocumentService::new(Arc::new(VectorStore::new()), Arc::new(embedder), &config)
    }

    fn unit_embedder() -> MockEmbeddingProvider {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed_batch()
            .returning(|texts| Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect()));
        embedder
    }

    #[tokio::test]
    async fn test_ingest_text_chunks_and_stores() {
        let service = service(unit_embedder());
        let (info, created) = service
            .ingest_text("Course catalog", "Biology 101 covers cells. Chemistry 101 covers atoms.")
            .await
            .unwrap();

        assert!(created);
        assert_eq!(info.title, "Course catalog");
        assert_eq!(info.file_type, "text/plain");
        assert!(info.chunk_count >= 3);
        assert_eq!(service.list().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_content_is_not_reembedded() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed_batch()
            .times(1)
            .returning(|texts| Ok(texts.iter().map(|_| vec![1.0]).collect()));
        let service = service(embedder);

        let (first, _) = service.ingest_text("a", "same text").await.unwrap();
        let (second, created) = service.ingest_text("b", "same text").await.unwrap();
        assert!(!created);
        assert_eq!(first.document_id, second.document_id);
    }

    #[tokio::test]
    async fn test_embedding_failure_surfaces() {
        let mut embedder = MockEmbeddingProvider::new();
        embedder
            .expect_embed_batch()
            .returning(|_| Err(anyhow::anyhow!("quota exceeded")));
        let service = service(embedder);

        let err = service.ingest_text("a", "text").await.unwrap_err();
        assert!(matches!(err, ApiError::LlmError(_)));
        assert!(service.list().is_empty());
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_file() {
        let service = service(MockEmbeddingProvider::new());
        let err = service.process_upload("photo.jpg", None, &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0]).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_delete_unknown_document() {
        let service = service(MockEmbeddingProvider::new());
        assert!(matches!(service.delete(Uuid::new_v4()), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_extract_attachments() {
        let attachments = vec![
            Attachment {
                file_name: "transcript.txt".to_string(),
                file_base64: STANDARD.encode("GPA 3.7\nAP Calculus: A"),
            },
            Attachment {
                file_name: "essay.md".to_string(),
                file_base64: format!("data:text/markdown;base64,{}", STANDARD.encode("Why I love physics")),
            },
        ];

        let context = DocumentService::extract_attachments(&attachments).unwrap().unwrap();
        assert!(context.starts_with("[transcript.txt]\nGPA 3.7\nAP Calculus: A"));
        assert!(context.contains("[essay.md]\nWhy I love physics"));
    }

    #[test]
    fn test_extract_attachments_rejects_bad_base64() {
        let attachments = vec![Attachment {
            file_name: "x.txt".to_string(),
            file_base64: "!!!not base64!!!".to_string(),
        }];
        assert!(matches!(
            DocumentService::extract_attachments(&attachments),
            Err(ApiError::BadRequest(_))
        ));
        assert!(DocumentService::extract_attachments(&[]).unwrap().is_none());
    }
}
