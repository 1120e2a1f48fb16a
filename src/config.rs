//! Configuration for convoy agents and the orchestrator
//!
//! Both processes load a TOML file at startup. API keys are never stored in
//! the file; the `[providers]` section names the environment variable that
//! holds the key. The environment contract recognized at resolution time:
//! the variable named by `api_key_env` (default `PRIMARY_API_KEY`) enables
//! the primary provider, with `PRIMARY_MODEL`, `SECONDARY_ENDPOINT` and
//! `SECONDARY_MODEL` as fallbacks for values the file omits. With neither
//! generative provider configured an agent degrades to echo-only behavior.

use crate::providers::chain::ProviderSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Configuration for one domain agent process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    pub agent: AgentSection,
    pub http: HttpSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub providers: ProviderSection,
}

/// Agent identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// Agent identifier (must match [a-zA-Z0-9._-]+)
    pub id: String,
    /// Description of what this agent does
    pub description: String,
    /// Optional system prompt handed to the generative providers
    pub system_prompt: Option<String>,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

/// Task store location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreSection {
    /// Data directory for the sled store; absent means an in-memory store
    /// that does not survive restarts
    pub path: Option<PathBuf>,
}

/// Provider selection knobs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSection {
    #[serde(default = "default_true")]
    pub use_primary: bool,
    /// Model for the hosted primary API; env `PRIMARY_MODEL` fills an
    /// absent value
    pub primary_model: Option<String>,
    /// Environment variable holding the primary API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Base URL override for the hosted primary API
    pub primary_base_url: Option<String>,
    #[serde(default = "default_true")]
    pub use_secondary: bool,
    /// Model for the local secondary server; env `SECONDARY_MODEL` fills an
    /// absent value
    pub secondary_model: Option<String>,
    /// Local secondary server URL; env `SECONDARY_ENDPOINT` fills an absent
    /// value
    pub secondary_endpoint: Option<Url>,
    /// Budget for a single provider attempt
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            use_primary: true,
            primary_model: None,
            api_key_env: default_api_key_env(),
            primary_base_url: None,
            use_secondary: true,
            secondary_model: None,
            secondary_endpoint: None,
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_key_env() -> String {
    "PRIMARY_API_KEY".to_string()
}

fn default_attempt_timeout_secs() -> u64 {
    30
}

impl AgentConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AgentConfig = toml::from_str(&content)?;
        validate_agent_id(&config.agent.id)?;
        Ok(config)
    }

    /// Resolve provider settings from this config and the environment
    pub fn provider_settings(&self) -> Result<ProviderSettings, ConfigError> {
        let p = &self.providers;

        let primary_api_key = std::env::var(&p.api_key_env).ok();
        let primary_model = p
            .primary_model
            .clone()
            .or_else(|| std::env::var("PRIMARY_MODEL").ok())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());

        let secondary_endpoint = match &p.secondary_endpoint {
            Some(url) => Some(url.clone()),
            None => match std::env::var("SECONDARY_ENDPOINT") {
                Ok(raw) => Some(raw.parse().map_err(|e| {
                    ConfigError::InvalidConfig(format!("bad SECONDARY_ENDPOINT '{raw}': {e}"))
                })?),
                Err(_) => None,
            },
        };
        let secondary_model = p
            .secondary_model
            .clone()
            .or_else(|| std::env::var("SECONDARY_MODEL").ok())
            .unwrap_or_else(|| "llama3".to_string());

        Ok(ProviderSettings {
            use_primary: p.use_primary,
            primary_model,
            primary_api_key,
            primary_base_url: p.primary_base_url.clone(),
            use_secondary: p.use_secondary,
            secondary_model,
            secondary_endpoint,
            system_prompt: self.agent.system_prompt.clone(),
            attempt_timeout: Duration::from_secs(p.attempt_timeout_secs),
        })
    }
}

/// Configuration for the orchestrator process
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    pub http: HttpSection,
    pub routing: RoutingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorSection {
    #[serde(default = "default_orchestrator_id")]
    pub id: String,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            id: default_orchestrator_id(),
        }
    }
}

fn default_orchestrator_id() -> String {
    "orchestrator".to_string()
}

/// Routing table and fan-out budgets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingSection {
    /// Delay between status polls against a domain agent
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Budget for a single sub-task to reach a terminal state
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,
    /// Budget for the whole routed message, independent of agent budgets
    #[serde(default = "default_overall_timeout_secs")]
    pub overall_timeout_secs: u64,
    /// Reply used when no intent matches
    #[serde(default = "default_no_handler_reply")]
    pub no_handler_reply: String,
    #[serde(default)]
    pub agents: Vec<RoutingEntryConfig>,
}

/// One routing table entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingEntryConfig {
    pub intent: String,
    pub address: Url,
    /// Keywords that map an incoming message onto this intent
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_agent_timeout_secs() -> u64 {
    30
}

fn default_overall_timeout_secs() -> u64 {
    90
}

fn default_no_handler_reply() -> String {
    "unable to route request".to_string()
}

impl OrchestratorConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: OrchestratorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate routing table consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_agent_id(&self.orchestrator.id)?;

        let mut seen = std::collections::HashSet::new();
        for entry in &self.routing.agents {
            validate_agent_id(&entry.intent)?;
            if !seen.insert(entry.intent.as_str()) {
                return Err(ConfigError::InvalidConfig(format!(
                    "duplicate routing intent '{}'",
                    entry.intent
                )));
            }
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid agent ID format: {0}")]
    InvalidAgentId(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Validate agent/intent identifier format
fn validate_agent_id(agent_id: &str) -> Result<(), ConfigError> {
    let valid_chars = agent_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if agent_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidAgentId(format!(
            "identifier '{agent_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}
