use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub document_id: Uuid,
    pub title: String,
    pub file_type: String,
    pub pages: Option<usize>,
    pub char_count: usize,
    pub chunk_count: usize,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IngestTextRequest {
    #[validate(
        length(min = 1, max = 200, message = "title must be 1-200 characters"),
        custom(function = "crate::models::not_blank")
    )]
    pub title: String,
    #[validate(custom(function = "crate::models::not_blank"))]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document: DocumentInfo,
    /// False when identical content was already ingested.
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentInfo>,
    pub total: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(
        length(min = 1, max = 2000, message = "question must be 1-2000 characters"),
        custom(function = "crate::models::not_blank")
    )]
    pub question: String,
    #[serde(default)]
    pub document_id: Option<Uuid>,
    #[validate(range(min = 1, max = 20, message = "top_k must be between 1 and 20"))]
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub model: String,
    pub mock: bool,
    pub sources: Vec<SourceInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    pub document_id: Uuid,
    pub document_title: String,
    pub chunk_index: usize,
    pub score: f32,
    pub preview: String,
}
