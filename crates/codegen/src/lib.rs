//! Code generation collaborator: natural-language prompt in, Manim scene
//! code out.
//!
//! Both supported providers expose an OpenAI-compatible chat-completions
//! endpoint, so one HTTP client serves them.

pub mod clean;
pub mod client;
pub mod config;

pub use client::{ChatCompletionsGenerator, CodeGenerator, CodegenError, GeneratedCode};
pub use config::{CodegenConfig, LlmProvider, ProviderConfig};
