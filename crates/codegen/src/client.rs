//! Chat-completions client used for code generation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::clean::clean_manim_code;
use crate::config::{CodegenConfig, LlmProvider};

/// Upper bound for a single generation call.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 4096;

/// Instructions sent ahead of every user prompt.
const SYSTEM_PROMPT: &str = "You are an expert Manim Community Edition developer. \
Write a single complete Python file that starts with `from manim import *` and \
defines exactly one Scene subclass that animates the user's request. Use Text() \
rather than MathTex() unless LaTeX is essential. Call methods with parentheses, \
for example .get_center(). Respond with code only.";

/// Errors from the generation providers.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("Provider {0} is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Provider returned no code")]
    EmptyResponse,
}

/// Code produced for one prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedCode {
    pub code: String,
    pub model: String,
    pub provider: LlmProvider,
    pub tokens_used: u32,
}

/// Produces Manim scene code from a natural-language prompt.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        provider: LlmProvider,
    ) -> Result<GeneratedCode, CodegenError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`CodeGenerator`] backed by OpenAI-compatible chat-completions APIs.
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    config: CodegenConfig,
}

impl ChatCompletionsGenerator {
    pub fn new(config: CodegenConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CodeGenerator for ChatCompletionsGenerator {
    async fn generate(
        &self,
        prompt: &str,
        provider: LlmProvider,
    ) -> Result<GeneratedCode, CodegenError> {
        let settings = self.config.provider(provider);
        let api_key = settings
            .api_key
            .as_deref()
            .ok_or(CodegenError::NotConfigured(provider.as_str()))?;

        let body = ChatRequest {
            model: &settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        tracing::debug!(provider = provider.as_str(), model = %settings.model, "Requesting code generation");

        let response = self
            .client
            .post(&settings.endpoint)
            .bearer_auth(api_key)
            .timeout(GENERATION_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CodegenError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        into_generated(parsed, &settings.model, provider)
    }
}

fn into_generated(
    response: ChatResponse,
    model: &str,
    provider: LlmProvider,
) -> Result<GeneratedCode, CodegenError> {
    let raw = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    let code = clean_manim_code(&raw);
    if code.is_empty() {
        return Err(CodegenError::EmptyResponse);
    }

    Ok(GeneratedCode {
        code,
        model: model.to_string(),
        provider,
        tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;

    fn parse(json: &str) -> ChatResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn response_is_cleaned_and_counted() {
        let response = parse(
            r#"{"choices":[{"message":{"content":"```python\nfrom manim import *\n```"}}],
                "usage":{"total_tokens":321}}"#,
        );
        let generated = into_generated(response, "m1", LlmProvider::Gemini).unwrap();
        assert_eq!(generated.code, "from manim import *");
        assert_eq!(generated.tokens_used, 321);
        assert_eq!(generated.provider, LlmProvider::Gemini);
        assert_eq!(generated.model, "m1");
    }

    #[test]
    fn missing_content_is_empty_response() {
        let response = parse(r#"{"choices":[]}"#);
        assert!(matches!(
            into_generated(response, "m1", LlmProvider::Groq),
            Err(CodegenError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn provider_without_key_is_not_configured() {
        let disabled = ProviderConfig {
            endpoint: "http://127.0.0.1:9".into(),
            api_key: None,
            model: "m".into(),
        };
        let generator = ChatCompletionsGenerator::new(CodegenConfig {
            groq: disabled.clone(),
            gemini: disabled,
        });
        let err = generator
            .generate("draw a circle please", LlmProvider::Groq)
            .await
            .unwrap_err();
        assert!(matches!(err, CodegenError::NotConfigured("groq")));
    }

    #[test]
    fn provider_names_are_lowercase() {
        let p: LlmProvider = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(p, LlmProvider::Gemini);
        assert_eq!(serde_json::to_string(&LlmProvider::Groq).unwrap(), "\"groq\"");
    }
}
