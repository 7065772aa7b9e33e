pub mod settings;

pub use settings::{
    EmbeddingConfig, LlmConfig, PromptsConfig, RagConfig, ServerConfig, SessionConfig, Settings,
    WebSearchConfig,
};
