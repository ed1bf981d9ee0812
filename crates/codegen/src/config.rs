use serde::{Deserialize, Serialize};

/// Default chat-completions endpoint for Groq.
const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
/// Default chat-completions endpoint for Gemini's OpenAI-compatible API.
const GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions";

const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro";

/// Which generation backend to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Groq,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        }
    }
}

/// Endpoint, credentials and model for one provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub endpoint: String,
    /// `None` disables the provider.
    pub api_key: Option<String>,
    pub model: String,
}

/// Code generation configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CodegenConfig {
    pub groq: ProviderConfig,
    pub gemini: ProviderConfig,
}

impl CodegenConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                    |
    /// |-------------------|----------------------------|
    /// | `GROQ_API_KEY`    | unset (provider disabled)  |
    /// | `GROQ_MODEL`      | `llama-3.3-70b-versatile`  |
    /// | `GROQ_ENDPOINT`   | Groq chat completions URL  |
    /// | `GEMINI_API_KEY`  | unset (provider disabled)  |
    /// | `GEMINI_MODEL`    | `gemini-1.5-pro`           |
    /// | `GEMINI_ENDPOINT` | Gemini OpenAI-compat URL   |
    pub fn from_env() -> Self {
        Self {
            groq: ProviderConfig {
                endpoint: env_or("GROQ_ENDPOINT", GROQ_ENDPOINT),
                api_key: non_empty_env("GROQ_API_KEY"),
                model: env_or("GROQ_MODEL", DEFAULT_GROQ_MODEL),
            },
            gemini: ProviderConfig {
                endpoint: env_or("GEMINI_ENDPOINT", GEMINI_ENDPOINT),
                api_key: non_empty_env("GEMINI_API_KEY"),
                model: env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            },
        }
    }

    pub fn provider(&self, provider: LlmProvider) -> &ProviderConfig {
        match provider {
            LlmProvider::Groq => &self.groq,
            LlmProvider::Gemini => &self.gemini,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
