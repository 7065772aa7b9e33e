//! Model orchestration for one chat turn.
//!
//! Builds the system prompt, then walks the candidate models (primary, then
//! fallback), racing each call against the configured timeout. When every
//! model fails the turn is answered with a canned reply, if enabled.

use anyhow::Result;
use rand::seq::IndexedRandom;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::{LlmConfig, WebSearchConfig};
use crate::models::chat::{AttemptStatus, ChatMessage, ModelAttempt};
use crate::models::profile::StudentProfile;
use crate::services::prompt::PromptBuilder;
use crate::utils::error::ApiError;
use crate::utils::limiters::Limiters;

pub const MOCK_MODEL: &str = "mock";

const MOCK_REPLIES: &[&str] = &[
    "I'm having trouble reaching my knowledge service right now, but here is a place to start: \
     list the subjects you enjoy most, look at which majors build on them, and compare the \
     course requirements of two or three schools you're interested in. Ask me again in a few \
     minutes and we can go deeper.",
    "I can't give you a detailed answer at the moment. In the meantime, a good next step is to \
     meet with your school counselor to review your transcript and graduation requirements, and \
     write down the questions you want to cover so we can work through them together later.",
    "My advice service is temporarily unavailable. While you wait, try building a simple plan: \
     note upcoming application or scholarship deadlines, the tests you still need to take, and \
     one extracurricular you'd like to grow this term. I'll be glad to help refine it shortly.",
];

/// Chat-completion backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String>;
}

/// Everything the client supplied for one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnInput<'a> {
    pub message: &'a str,
    pub history: &'a [ChatMessage],
    pub profile: Option<&'a StudentProfile>,
    pub document_context: Option<&'a str>,
    pub web_search: bool,
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    pub model: String,
    pub attempts: Vec<ModelAttempt>,
    pub fallback_used: bool,
    pub mock: bool,
    pub web_search: bool,
    pub latency_ms: u64,
}

pub struct ChatOrchestrator {
    provider: Arc<dyn LlmProvider>,
    prompt_builder: PromptBuilder,
    llm: LlmConfig,
    web_search: WebSearchConfig,
    limiters: Arc<Limiters>,
}

impl ChatOrchestrator {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        prompt_builder: PromptBuilder,
        llm: LlmConfig,
        web_search: WebSearchConfig,
        limiters: Arc<Limiters>,
    ) -> Self {
        Self {
            provider,
            prompt_builder,
            llm,
            web_search,
            limiters,
        }
    }

    pub fn primary_model(&self) -> &str {
        &self.llm.primary_model
    }

    /// Models to try, in order, for a turn. Ids are unique after suffixing.
    pub fn candidate_models(&self, web_search: bool) -> Vec<String> {
        let mut models: Vec<String> = std::iter::once(self.llm.primary_model.trim())
            .chain(self.llm.fallback())
            .map(|model| {
                let suffix = self.web_search.model_suffix.trim();
                if web_search && !suffix.is_empty() && !model.ends_with(suffix) {
                    format!("{}{}", model, suffix)
                } else {
                    model.to_string()
                }
            })
            .collect();
        models.dedup();
        models
    }

    pub async fn respond(&self, input: TurnInput<'_>) -> Result<ChatOutcome, ApiError> {
        let start = Instant::now();
        let web_search = input.web_search && self.web_search.enabled;

        let system_prompt = self
            .prompt_builder
            .system_components(input.profile, input.document_context, web_search)
            .build();
        let messages = self
            .prompt_builder
            .build_messages(system_prompt, input.history, input.message);

        let mut attempts = Vec::new();

        for (position, model) in self.candidate_models(web_search).into_iter().enumerate() {
            let (attempt, reply) = self.attempt(&model, &messages).await;
            attempts.push(attempt);

            if let Some(reply) = reply {
                return Ok(ChatOutcome {
                    reply,
                    model,
                    attempts,
                    fallback_used: position > 0,
                    mock: false,
                    web_search,
                    latency_ms: start.elapsed().as_millis() as u64,
                });
            }
        }

        let timed_out = attempts
            .last()
            .is_some_and(|a| a.status == AttemptStatus::TimedOut);

        if self.llm.mock_fallback {
            warn!("All {} model attempts failed, serving mock reply", attempts.len());
            return Ok(ChatOutcome {
                reply: mock_reply(),
                model: MOCK_MODEL.to_string(),
                fallback_used: attempts.len() > 1,
                attempts,
                mock: true,
                web_search,
                latency_ms: start.elapsed().as_millis() as u64,
            });
        }

        let summary = attempts
            .iter()
            .map(|a| format!("{}: {}", a.model, a.error.as_deref().unwrap_or("failed")))
            .collect::<Vec<_>>()
            .join("; ");

        if timed_out {
            Err(ApiError::Timeout(format!("All models failed ({})", summary)))
        } else {
            Err(ApiError::LlmError(format!("All models failed ({})", summary)))
        }
    }

    async fn attempt(&self, model: &str, messages: &[ChatMessage]) -> (ModelAttempt, Option<String>) {
        let start = Instant::now();
        let timeout = Duration::from_secs(self.llm.timeout_seconds);

        let finish = |status: AttemptStatus, error: Option<String>| ModelAttempt {
            model: model.to_string(),
            status,
            latency_ms: start.elapsed().as_millis() as u64,
            error,
        };

        let _permit = match Limiters::acquire_timed(
            self.limiters.llm.clone(),
            self.limiters.acquire_timeout,
            "llm_complete",
        )
        .await
        {
            Ok((permit, _waited)) => permit,
            Err(e) => {
                warn!("Model {} skipped: {}", model, e);
                return (finish(AttemptStatus::Failed, Some(e.to_string())), None);
            }
        };

        match tokio::time::timeout(timeout, self.provider.complete(model, messages)).await {
            Ok(Ok(reply)) if !reply.trim().is_empty() => {
                let attempt = finish(AttemptStatus::Success, None);
                info!("Model {} answered in {}ms", model, attempt.latency_ms);
                (attempt, Some(reply))
            }
            Ok(Ok(_)) => {
                warn!("Model {} returned an empty reply", model);
                (finish(AttemptStatus::Failed, Some("empty reply".to_string())), None)
            }
            Ok(Err(e)) => {
                warn!("Model {} failed: {:#}", model, e);
                (finish(AttemptStatus::Failed, Some(format!("{:#}", e))), None)
            }
            Err(_) => {
                warn!("Model {} timed out after {:?}", model, timeout);
                (
                    finish(
                        AttemptStatus::TimedOut,
                        Some(format!("timed out after {}s", timeout.as_secs())),
                    ),
                    None,
                )
            }
        }
    }
}

fn mock_reply() -> String {
    MOCK_REPLIES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(MOCK_REPLIES[0])
        .to_string()
}
