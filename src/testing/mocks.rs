//! Mock implementations for testing
//!
//! Provides a scriptable [`ResponseProvider`] and a fixed-output intent
//! classifier so provider-chain and orchestrator behavior can be exercised
//! without any external service.

use crate::orchestrator::IntentClassifier;
use crate::providers::{ProviderError, ProviderKind, ResponseProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

enum MockBehavior {
    Succeed(String),
    Fail(ProviderError),
    /// Never resolves; exercises the chain's attempt timeout
    Stall,
}

/// Scriptable provider for chain tests
pub struct MockProvider {
    kind: ProviderKind,
    behavior: MockBehavior,
    calls: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn succeeding(kind: ProviderKind, reply: &str) -> Self {
        Self {
            kind,
            behavior: MockBehavior::Succeed(reply.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(kind: ProviderKind, error: ProviderError) -> Self {
        Self {
            kind,
            behavior: MockBehavior::Fail(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn stalling(kind: ProviderKind) -> Self {
        Self {
            kind,
            behavior: MockBehavior::Stall,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared attempt counter, observable after the provider is boxed
    pub fn call_count(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ResponseProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn label(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, _input: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockBehavior::Succeed(reply) => Ok(reply.clone()),
            MockBehavior::Fail(error) => Err(error.clone()),
            MockBehavior::Stall => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Classifier returning a fixed intent list regardless of input
pub struct FixedClassifier {
    intents: Vec<String>,
}

impl FixedClassifier {
    pub fn new(intents: &[&str]) -> Self {
        Self {
            intents: intents.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IntentClassifier for FixedClassifier {
    fn classify(&self, _input: &str) -> Vec<String> {
        self.intents.clone()
    }
}
