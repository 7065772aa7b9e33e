use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub web_search: WebSearchConfig,
    pub session: SessionConfig,
    pub rag: RagConfig,
    pub prompts: PromptsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            body_limit_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible API root, e.g. `https://openrouter.ai/api/v1`
    pub base_url: String,
    pub api_key: String,
    pub primary_model: String,
    /// Empty disables the second attempt.
    pub fallback_model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Serve a canned reply when every model fails.
    pub mock_fallback: bool,
    pub concurrency: usize,
    pub acquire_timeout_ms: u64,
    /// Sent as `HTTP-Referer` (OpenRouter attribution).
    pub app_url: String,
    /// Sent as `X-Title` (OpenRouter attribution).
    pub app_name: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: String::new(),
            primary_model: "openai/gpt-4o-mini".to_string(),
            fallback_model: "meta-llama/llama-3.1-8b-instruct".to_string(),
            timeout_seconds: 30,
            max_tokens: 1024,
            temperature: 0.7,
            mock_fallback: true,
            concurrency: 8,
            acquire_timeout_ms: 5_000,
            app_url: String::new(),
            app_name: "Academic Counselor".to_string(),
        }
    }
}

impl LlmConfig {
    pub fn fallback(&self) -> Option<&str> {
        let model = self.fallback_model.trim();
        (!model.is_empty() && model != self.primary_model.trim()).then_some(model)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSearchConfig {
    pub enabled: bool,
    /// Appended to model ids when a turn asks for web search (OpenRouter `:online`).
    pub model_suffix: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_suffix: ":online".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    pub idle_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: 30 * 60,
            sweep_interval_seconds: 5 * 60,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_context_chars: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            max_context_chars: 12_000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PromptsConfig {
    pub counselor_system_prompt: String,
    pub web_search_instruction: String,
    pub document_context_header: String,
    pub profile_context_header: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            counselor_system_prompt: "You are a friendly, knowledgeable academic counselor helping \
                high school and college students plan their education. Give practical, specific \
                advice about courses, majors, college applications, scholarships and study habits. \
                Be encouraging and honest. If you are unsure about a fact such as a deadline or \
                admission statistic, say so and suggest where the student can verify it."
                .to_string(),
            web_search_instruction: "Web search is enabled for this question. Use current \
                information from the web where it helps, and cite the sources you relied on \
                with their URLs."
                .to_string(),
            document_context_header: "The student shared the following document content. Use it \
                when it is relevant to their question:"
                .to_string(),
            profile_context_header: "Student profile:".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        settings.apply_key_fallbacks(|name| std::env::var(name).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Fill empty API keys from the conventional provider variables.
    fn apply_key_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let provider_key = || {
            ["OPENROUTER_API_KEY", "OPENAI_API_KEY"]
                .iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        };

        if self.llm.api_key.trim().is_empty() {
            if let Some(key) = provider_key() {
                self.llm.api_key = key;
            }
        }
        if self.embedding.api_key.trim().is_empty() {
            if let Some(key) = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()) {
                self.embedding.api_key = key;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if self.llm.primary_model.trim().is_empty() {
            anyhow::bail!("llm.primary_model must be set");
        }
        if self.llm.timeout_seconds == 0 {
            anyhow::bail!("llm.timeout_seconds must be greater than zero");
        }
        if self.rag.chunk_size == 0 || self.rag.chunk_overlap >= self.rag.chunk_size {
            anyhow::bail!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap,
                self.rag.chunk_size
            );
        }
        if self.session.sweep_interval_seconds == 0 {
            anyhow::bail!("session.sweep_interval_seconds must be greater than zero");
        }
        Ok(())
    }
}
