use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }

    /// Only user/assistant turns may come from the client.
    pub fn is_conversational(&self) -> bool {
        matches!(self.role.as_str(), "user" | "assistant")
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(
        length(min = 1, max = 8000, message = "message must be 1-8000 characters"),
        custom(function = "crate::models::not_blank")
    )]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub profile_id: Option<Uuid>,
    /// Pre-extracted document text supplied by the client.
    #[serde(default)]
    pub document_context: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub web_search: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub file_base64: String,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
    pub model: String,
    pub fallback_used: bool,
    pub mock: bool,
    pub web_search: bool,
    pub attempts: Vec<ModelAttempt>,
    pub message_count: u64,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelAttempt {
    pub model: String,
    pub status: AttemptStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Failed,
    TimedOut,
}
