//! Orchestrator: classify, fan out, aggregate
//!
//! The orchestrator holds an immutable routing table built at startup,
//! classifies each incoming message into zero or more intents, submits a
//! sub-task to every matched domain agent concurrently, and folds the
//! sub-results into a single reply. Partial failure is reported in the
//! reply text, never silently dropped, and never aborts sibling sub-tasks.

pub mod classify;
pub mod client;
pub mod service;

pub use classify::{IntentClassifier, KeywordClassifier};
pub use client::AgentClient;

use crate::config::{OrchestratorConfig, RoutingEntryConfig};
use crate::error::{AgentError, AgentResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};
use url::Url;

/// One entry of the routing table: intent key to domain agent address
#[derive(Debug, Clone)]
pub struct RoutingEntry {
    pub intent: String,
    pub address: Url,
}

/// Static intent-to-agent mapping, ordered and immutable after startup
#[derive(Debug, Clone)]
pub struct RoutingTable {
    entries: Vec<RoutingEntry>,
}

impl RoutingTable {
    pub fn new(entries: Vec<RoutingEntry>) -> Self {
        Self { entries }
    }

    /// Entries in table order
    pub fn entries(&self) -> &[RoutingEntry] {
        &self.entries
    }

    pub fn lookup(&self, intent: &str) -> Option<&RoutingEntry> {
        self.entries.iter().find(|e| e.intent == intent)
    }
}

/// Fan-out budgets and fixed replies
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    pub poll_interval: Duration,
    pub agent_timeout: Duration,
    pub overall_timeout: Duration,
    pub no_handler_reply: String,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            agent_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(90),
            no_handler_reply: "unable to route request".to_string(),
        }
    }
}

/// The orchestrating agent
pub struct Orchestrator {
    id: String,
    table: RoutingTable,
    classifier: Arc<dyn IntentClassifier>,
    client: AgentClient,
    policy: RoutingPolicy,
}

impl Orchestrator {
    pub fn new(
        id: impl Into<String>,
        table: RoutingTable,
        classifier: Arc<dyn IntentClassifier>,
        policy: RoutingPolicy,
    ) -> Self {
        let id = id.into();
        let client = AgentClient::new(id.clone());
        Self {
            id,
            table,
            classifier,
            client,
            policy,
        }
    }

    /// Build an orchestrator from its config, wiring the keyword classifier
    /// from the routing entries
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        let entries = config
            .routing
            .agents
            .iter()
            .map(|e: &RoutingEntryConfig| RoutingEntry {
                intent: e.intent.clone(),
                address: e.address.clone(),
            })
            .collect();
        let classifier = KeywordClassifier::from_entries(&config.routing.agents);
        let policy = RoutingPolicy {
            poll_interval: Duration::from_millis(config.routing.poll_interval_ms),
            agent_timeout: Duration::from_secs(config.routing.agent_timeout_secs),
            overall_timeout: Duration::from_secs(config.routing.overall_timeout_secs),
            no_handler_reply: config.routing.no_handler_reply.clone(),
        };

        Self::new(
            config.orchestrator.id.clone(),
            RoutingTable::new(entries),
            Arc::new(classifier),
            policy,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Route one message and aggregate the sub-results into a reply
    #[tracing::instrument(name = "handle_message", skip(self, input_text))]
    pub async fn handle_message(&self, input_text: &str) -> String {
        let matched = self.classifier.classify(input_text);
        info!(intents = ?matched, "classified message");

        if matched.is_empty() {
            return self.policy.no_handler_reply.clone();
        }

        let mut outcomes = self.fan_out(&matched, input_text).await;
        aggregate_replies(&matched, &mut outcomes, &self.policy)
    }

    /// Submit a sub-task to every matched agent concurrently and collect
    /// outcomes until done or the overall deadline passes
    async fn fan_out(
        &self,
        matched: &[String],
        input_text: &str,
    ) -> HashMap<String, AgentResult<String>> {
        let mut set = JoinSet::new();
        for intent in matched {
            let Some(entry) = self.table.lookup(intent) else {
                continue;
            };
            let client = self.client.clone();
            let address = entry.address.clone();
            let intent = intent.clone();
            let input = input_text.to_string();
            let poll_interval = self.policy.poll_interval;
            let agent_timeout = self.policy.agent_timeout;

            set.spawn(async move {
                let outcome = client
                    .run_to_completion(&address, &intent, &input, poll_interval, agent_timeout)
                    .await;
                (intent, outcome)
            });
        }

        let deadline = tokio::time::Instant::now() + self.policy.overall_timeout;
        let mut outcomes = HashMap::new();
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((intent, outcome)))) => {
                    outcomes.insert(intent, outcome);
                }
                Ok(Some(Err(join_error))) => {
                    warn!(error = %join_error, "routed sub-task aborted");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        budget_secs = self.policy.overall_timeout.as_secs(),
                        "overall routing deadline passed with sub-tasks outstanding"
                    );
                    set.abort_all();
                    break;
                }
            }
        }
        outcomes
    }
}

/// Fold sub-task outcomes into the caller-visible reply (pure function)
///
/// Zero matched intents never reaches here. One intent returns its result
/// verbatim on success; multiple intents produce one line per intent in
/// routing-table order, prefixed with the intent key. Failures render as a
/// visible marker in both shapes. Intents missing from `outcomes` ran out
/// of the overall budget.
fn aggregate_replies(
    matched: &[String],
    outcomes: &mut HashMap<String, AgentResult<String>>,
    policy: &RoutingPolicy,
) -> String {
    let outcome_for = |outcomes: &mut HashMap<String, AgentResult<String>>, intent: &str| {
        outcomes
            .remove(intent)
            .unwrap_or_else(|| {
                Err(AgentError::UpstreamTimeout {
                    agent: intent.to_string(),
                    budget_secs: policy.overall_timeout.as_secs(),
                })
            })
    };

    if let [only] = matched {
        return match outcome_for(outcomes, only) {
            Ok(text) => text,
            Err(e) => failure_marker(only, &e),
        };
    }

    matched
        .iter()
        .map(|intent| match outcome_for(outcomes, intent) {
            Ok(text) => format!("{intent}: {text}"),
            Err(e) => failure_marker(intent, &e),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn failure_marker(intent: &str, error: &AgentError) -> String {
    format!("{intent}: [failed: {error}]")
}
