//! Provider fallback chain
//!
//! Settings resolve once into an ordered plan of generative providers
//! (primary, then secondary). Each attempt gets one bounded try; any error
//! falls through to the next provider, and the deterministic echo terminates
//! the chain, so producing a reply never fails a task.

use crate::providers::{
    OllamaConfig, OllamaProvider, OpenAiConfig, OpenAiProvider, ProviderKind, ProviderResult,
    ResponseProvider,
};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};
use url::Url;

/// Provider selection settings, resolved from config and environment
///
/// Recognized knobs: enable/disable flags and model selectors for the
/// primary and secondary providers, the secondary endpoint, and an optional
/// system prompt shared by both generative backends. A provider is part of
/// the plan only when its flag is set *and* its required configuration
/// (API key, endpoint) is present.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub use_primary: bool,
    pub primary_model: String,
    pub primary_api_key: Option<String>,
    /// Override for the hosted API base URL; tests point this at a local double
    pub primary_base_url: Option<String>,
    pub use_secondary: bool,
    pub secondary_model: String,
    pub secondary_endpoint: Option<Url>,
    pub system_prompt: Option<String>,
    pub attempt_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            use_primary: true,
            primary_model: "gpt-4o-mini".to_string(),
            primary_api_key: None,
            primary_base_url: None,
            use_secondary: true,
            secondary_model: "llama3".to_string(),
            secondary_endpoint: None,
            system_prompt: None,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Resolve settings into the ordered list of generative providers to try
///
/// Pure with respect to its input: the same settings always produce the same
/// plan. Evaluated once per chain, not per task. The echo fallback is not
/// part of the plan; it is the chain's unconditional terminal step.
pub fn build_plan(settings: &ProviderSettings) -> Vec<Box<dyn ResponseProvider>> {
    let mut plan: Vec<Box<dyn ResponseProvider>> = Vec::new();

    if settings.use_primary {
        match settings.primary_api_key.as_deref() {
            Some(key) if !key.is_empty() => {
                let mut config = OpenAiConfig {
                    api_key: key.to_string(),
                    model: settings.primary_model.clone(),
                    system_prompt: settings.system_prompt.clone(),
                    timeout: settings.attempt_timeout,
                    ..Default::default()
                };
                if let Some(base_url) = &settings.primary_base_url {
                    config.base_url = base_url.clone();
                }
                match OpenAiProvider::new(config) {
                    Ok(provider) => plan.push(Box::new(provider)),
                    Err(e) => warn!(error = %e, "primary provider unavailable, skipping"),
                }
            }
            _ => info!("no primary API key configured, skipping primary provider"),
        }
    }

    if settings.use_secondary {
        match &settings.secondary_endpoint {
            Some(endpoint) => {
                let config = OllamaConfig {
                    endpoint: endpoint.clone(),
                    model: settings.secondary_model.clone(),
                    system_prompt: settings.system_prompt.clone(),
                    timeout: settings.attempt_timeout,
                };
                match OllamaProvider::new(config) {
                    Ok(provider) => plan.push(Box::new(provider)),
                    Err(e) => warn!(error = %e, "secondary provider unavailable, skipping"),
                }
            }
            None => info!("no secondary endpoint configured, skipping secondary provider"),
        }
    }

    plan
}

/// Fixed-precedence response pipeline for one agent
pub struct ProviderChain {
    plan: Vec<Box<dyn ResponseProvider>>,
    attempt_timeout: Duration,
}

impl ProviderChain {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            plan: build_plan(settings),
            attempt_timeout: settings.attempt_timeout,
        }
    }

    /// Build a chain from an explicit plan; used by tests with mock providers
    pub fn from_plan(plan: Vec<Box<dyn ResponseProvider>>, attempt_timeout: Duration) -> Self {
        Self {
            plan,
            attempt_timeout,
        }
    }

    /// Labels of the generative providers in attempt order
    pub fn plan_labels(&self) -> Vec<&'static str> {
        self.plan.iter().map(|p| p.label()).collect()
    }

    /// Produce a reply for `input`
    ///
    /// Tries each planned provider exactly once under the attempt timeout;
    /// exhausting the plan echoes the input back unchanged, so this never
    /// fails and `generate(x).text == x` holds whenever no generative
    /// provider is configured.
    pub async fn generate(&self, input: &str) -> ProviderResult {
        for provider in &self.plan {
            match timeout(self.attempt_timeout, provider.generate(input)).await {
                Ok(Ok(text)) => {
                    info!(provider = provider.label(), "provider produced reply");
                    return ProviderResult {
                        provider: provider.kind(),
                        text,
                    };
                }
                Ok(Err(e)) => {
                    warn!(provider = provider.label(), error = %e, "provider failed, falling through");
                }
                Err(_) => {
                    warn!(
                        provider = provider.label(),
                        timeout_secs = self.attempt_timeout.as_secs(),
                        "provider attempt timed out, falling through"
                    );
                }
            }
        }

        ProviderResult {
            provider: ProviderKind::Fallback,
            text: input.to_string(),
        }
    }
}
