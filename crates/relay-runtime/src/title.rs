use std::sync::Arc;

use async_trait::async_trait;
use relay_llm::{ChatClient, ChatOptions, ChatRequest, Message};

const TRUNCATE_CHARS: usize = 30;
const MAX_TITLE_CHARS: usize = 80;

const TITLE_PROMPT: &str = "Generate a short title (at most 80 characters) summarizing the \
user's first message. Reply with the title only, without quotes or punctuation at the end.";

/// Produces a chat title from the first user message. Never fails: generators
/// degrade to something usable instead.
#[async_trait]
pub trait TitleGenerator: Send + Sync {
    async fn generate(&self, first_message: &str) -> String;
}

/// First 30 characters followed by `...`
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncatingTitleGenerator;

impl TruncatingTitleGenerator {
    pub fn title_for(message: &str) -> String {
        let head: String = message.chars().take(TRUNCATE_CHARS).collect();
        format!("{}...", head)
    }
}

#[async_trait]
impl TitleGenerator for TruncatingTitleGenerator {
    async fn generate(&self, first_message: &str) -> String {
        Self::title_for(first_message)
    }
}

/// Asks a chat model for a title, falling back to truncation
pub struct LlmTitleGenerator {
    client: Arc<dyn ChatClient>,
    model: String,
}

impl LlmTitleGenerator {
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn clean(raw: &str) -> Option<String> {
        let title = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
        if title.is_empty() {
            return None;
        }
        Some(title.chars().take(MAX_TITLE_CHARS).collect())
    }
}

#[async_trait]
impl TitleGenerator for LlmTitleGenerator {
    async fn generate(&self, first_message: &str) -> String {
        let request = ChatRequest::new(
            self.model.clone(),
            vec![Message::system(TITLE_PROMPT), Message::human(first_message)],
        )
        .with_options(ChatOptions::new().temperature(0.2).max_tokens(32));

        match self.client.chat(request).await {
            Ok(response) => match response.content.as_deref().and_then(Self::clean) {
                Some(title) => title,
                None => {
                    tracing::warn!("Title model returned no text, truncating message instead");
                    TruncatingTitleGenerator::title_for(first_message)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Title generation failed, truncating message instead");
                TruncatingTitleGenerator::title_for(first_message)
            }
        }
    }
}
