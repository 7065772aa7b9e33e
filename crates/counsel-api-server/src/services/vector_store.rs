use parking_lot::RwLock;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::document::DocumentInfo;
use crate::utils::cosine_similarity;

#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub info: DocumentInfo,
    pub chunks: Vec<StoredChunk>,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub document_id: Uuid,
    pub document_title: String,
    pub chunk_index: usize,
    pub content: String,
    pub score: f32,
}

/// In-memory chunk index with brute-force cosine ranking.
#[derive(Default)]
pub struct VectorStore {
    documents: RwLock<Vec<StoredDocument>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_hash(&self, content_hash: &str) -> Option<DocumentInfo> {
        self.documents
            .read()
            .iter()
            .find(|d| d.info.content_hash == content_hash)
            .map(|d| d.info.clone())
    }

    /// Insert unless a document with the same content hash exists.
    /// Returns the stored info and whether it was newly inserted.
    pub fn insert(&self, document: StoredDocument) -> (DocumentInfo, bool) {
        let mut documents = self.documents.write();
        if let Some(existing) = documents
            .iter()
            .find(|d| d.info.content_hash == document.info.content_hash)
        {
            return (existing.info.clone(), false);
        }
        let info = document.info.clone();
        documents.push(document);
        (info, true)
    }

    pub fn remove(&self, document_id: Uuid) -> bool {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|d| d.info.document_id != document_id);
        documents.len() != before
    }

    pub fn contains(&self, document_id: Uuid) -> bool {
        self.documents
            .read()
            .iter()
            .any(|d| d.info.document_id == document_id)
    }

    pub fn list(&self) -> Vec<DocumentInfo> {
        self.documents.read().iter().map(|d| d.info.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Top `top_k` chunks by cosine similarity, optionally within one document.
    /// Chunks whose dimension does not match the query are skipped.
    pub fn search(&self, query: &[f32], document_id: Option<Uuid>, top_k: usize) -> Vec<ScoredChunk> {
        let documents = self.documents.read();

        let mut scored: Vec<ScoredChunk> = documents
            .iter()
            .filter(|d| document_id.is_none_or(|id| d.info.document_id == id))
            .flat_map(|d| {
                d.chunks.iter().filter_map(move |chunk| {
                    cosine_similarity(query, &chunk.embedding)
                        .ok()
                        .map(|score| ScoredChunk {
                            document_id: d.info.document_id,
                            document_title: d.info.title.clone(),
                            chunk_index: chunk.index,
                            content: chunk.content.clone(),
                            score,
                        })
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);
        scored
    }
}
