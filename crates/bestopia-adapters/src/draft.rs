//! LLM drafting collaborator. The only contract with the model is prompt
//! text asking for tab-separated blocks; nothing here validates shape.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const OPENAI_CHAT_COMPLETIONS: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("drafting api returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("drafting api returned no content")]
    EmptyResponse,
}

/// `complete` returns free-form text expected (but not guaranteed) to be
/// TSV-shaped. Callers own the parsing.
#[async_trait]
pub trait DraftingClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, DraftError>;
}

pub struct OpenAiDraftingClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiDraftingClient {
    pub fn new(api_key: String, model: String) -> Self {
        // Larger completions only for the full-size model, matching the
        // token limits the drafting prompts were tuned against.
        let max_tokens = if model == "gpt-4o" { 3000 } else { 1500 };
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            max_tokens,
        }
    }

    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        let model =
            std::env::var("BESTOPIA_DRAFT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        Self::new(api_key, model)
    }
}

#[async_trait]
impl DraftingClient for OpenAiDraftingClient {
    async fn complete(&self, prompt: &str) -> Result<String, DraftError> {
        debug!(model = %self.model, max_tokens = self.max_tokens, "requesting draft");
        let resp = self
            .client
            .post(OPENAI_CHAT_COMPLETIONS)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": self.max_tokens,
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DraftError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(DraftError::EmptyResponse)?;
        Ok(strip_html_tags(&content))
    }
}

/// Drop `<...>` tag spans the model occasionally wraps values in.
pub fn strip_html_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_keeps_text() {
        assert_eq!(strip_html_tags("a <b>bold</b> claim"), "a bold claim");
        assert_eq!(strip_html_tags("no tags here"), "no tags here");
    }

    #[test]
    fn unclosed_tag_swallows_remainder() {
        assert_eq!(strip_html_tags("start <never closed"), "start ");
    }

    #[test]
    fn model_choice_sets_token_budget() {
        assert_eq!(OpenAiDraftingClient::new(String::new(), "gpt-4o".into()).max_tokens, 3000);
        assert_eq!(
            OpenAiDraftingClient::new(String::new(), "gpt-4o-mini".into()).max_tokens,
            1500
        );
    }
}
