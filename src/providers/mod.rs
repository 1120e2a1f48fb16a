//! Response provider abstraction
//!
//! A provider turns task input text into reply text. Providers are tried in
//! a fixed precedence by the [`chain::ProviderChain`]: the hosted primary
//! API, then a locally reachable secondary server, then a deterministic
//! echo. Providers know nothing about tasks or storage.

pub mod chain;
pub mod ollama;
pub mod openai;

pub use chain::{build_plan, ProviderChain, ProviderSettings};
pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Position of a provider in the fallback precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Primary,
    Secondary,
    Fallback,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Primary => "primary",
            ProviderKind::Secondary => "secondary",
            ProviderKind::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// Reply produced by one provider attempt
///
/// Ephemeral: only `text` outlives the task's processing, as the task's
/// result.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    pub provider: ProviderKind,
    pub text: String,
}

/// Text generation backend
#[async_trait]
pub trait ResponseProvider: Send + Sync {
    /// Precedence slot this provider occupies
    fn kind(&self) -> ProviderKind;

    /// Short backend label for logs (e.g. "openai", "ollama")
    fn label(&self) -> &'static str;

    /// Produce reply text for the given input
    async fn generate(&self, input: &str) -> Result<String, ProviderError>;
}

/// Provider errors
///
/// All of these are absorbed by the chain: a failing provider falls through
/// to the next one and is never retried.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("provider not configured: {0}")]
    NotConfigured(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
