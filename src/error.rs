//! Crate-wide error types
//!
//! Errors never cross the protocol boundary raw: anything that must reach a
//! peer is rendered through [`AgentError::to_error_envelope`], which
//! sanitizes the message first. Provider errors are absorbed inside the
//! chain and never appear here; storage failures are fatal to one task only.

use crate::config::ConfigError;
use crate::protocol::Envelope;
use crate::store::StoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for convoy operations
#[derive(Debug, Error)]
pub enum AgentError {
    /// A provider's required configuration is absent; triggers fall-through,
    /// never fails a task
    #[error("provider configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A generative provider could not be reached or answered garbage;
    /// triggers fall-through, never fails a task
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("task {0} not found")]
    NotFound(Uuid),

    /// Result requested before the task reached a terminal state
    #[error("task {0} has not reached a terminal state")]
    NotTerminal(Uuid),

    /// A routed sub-task ended Failed on the remote agent
    #[error("upstream agent error: {0}")]
    Upstream(String),

    /// A routed sub-task did not reach a terminal state within budget
    #[error("agent '{agent}' did not finish within {budget_secs}s")]
    UpstreamTimeout { agent: String, budget_secs: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AgentError {
    /// Render this error as a protocol Error envelope with sanitized text
    pub fn to_error_envelope(
        &self,
        task_id: Uuid,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Envelope {
        Envelope::error(
            task_id,
            sender,
            recipient,
            sanitize_error_message(&self.to_string()),
        )
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream(message.into())
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern compiles")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern compiles")
});

const MAX_MESSAGE_LEN: usize = 500;

/// Scrub secrets and sensitive paths from error text before it goes on the
/// wire, and cap its length
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN.replace_all(message, "${1}=***").to_string();
    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let max_content_len = MAX_MESSAGE_LEN - truncate_suffix.len();
        sanitized = format!("{}{}", &sanitized[..max_content_len], truncate_suffix);
    }

    sanitized
}

/// Result type for convoy operations
pub type AgentResult<T> = Result<T, AgentError>;
