use crate::config::PromptsConfig;
use crate::models::chat::ChatMessage;
use crate::models::profile::StudentProfile;

/// Max prior turns forwarded to the model.
pub const MAX_HISTORY_MESSAGES: usize = 20;

const TRUNCATION_MARKER: &str = "\n[... document truncated ...]";

/// Pieces of the system message for one turn.
#[derive(Debug, Clone, Default)]
pub struct SystemContextComponents {
    pub base_instruction: String,
    pub profile_section: Option<String>,
    pub document_section: Option<String>,
    pub web_search_section: Option<String>,
}

impl SystemContextComponents {
    pub fn build(&self) -> String {
        let mut parts = vec![self.base_instruction.trim().to_string()];
        parts.extend(
            [&self.profile_section, &self.document_section, &self.web_search_section]
                .into_iter()
                .flatten()
                .cloned(),
        );
        parts.join("\n\n")
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    prompts: PromptsConfig,
    max_context_chars: usize,
}

impl PromptBuilder {
    pub fn new(prompts: PromptsConfig, max_context_chars: usize) -> Self {
        Self { prompts, max_context_chars }
    }

    pub fn system_components(
        &self,
        profile: Option<&StudentProfile>,
        document_context: Option<&str>,
        web_search: bool,
    ) -> SystemContextComponents {
        let profile_section = profile.map(|p| {
            let mut lines = vec![self.prompts.profile_context_header.clone()];
            lines.extend(p.context_lines());
            lines.join("\n")
        });

        let document_section = document_context
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| {
                format!(
                    "{}\n{}",
                    self.prompts.document_context_header,
                    truncate_chars(text, self.max_context_chars)
                )
            });

        let web_search_section = web_search.then(|| self.prompts.web_search_instruction.clone());

        SystemContextComponents {
            base_instruction: self.prompts.counselor_system_prompt.clone(),
            profile_section,
            document_section,
            web_search_section,
        }
    }

    /// System prompt, trimmed history, then the new user message.
    pub fn build_messages(
        &self,
        system_prompt: String,
        history: &[ChatMessage],
        message: &str,
    ) -> Vec<ChatMessage> {
        let conversational: Vec<&ChatMessage> =
            history.iter().filter(|m| m.is_conversational()).collect();
        let skip = conversational.len().saturating_sub(MAX_HISTORY_MESSAGES);

        let mut messages = Vec::with_capacity(MAX_HISTORY_MESSAGES + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(conversational.into_iter().skip(skip).cloned());
        messages.push(ChatMessage::user(message.trim()));
        messages
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
