pub mod document_service;
pub mod embedding_service;
pub mod llm_service;
pub mod orchestrator;
pub mod profile_store;
pub mod prompt;
pub mod rag_service;
pub mod session_tracker;
pub mod vector_store;

pub use document_service::DocumentService;
pub use embedding_service::EmbeddingService;
pub use llm_service::LlmService;
pub use orchestrator::ChatOrchestrator;
pub use profile_store::ProfileStore;
pub use rag_service::RagService;
pub use session_tracker::SessionTracker;
pub use vector_store::VectorStore;
