//! HTTP client for the domain-agent protocol
//!
//! Implements the caller side of submit/status/result against one agent,
//! plus the poll loop that drives a sub-task to a terminal state under a
//! deadline. Error envelopes from the agent become [`AgentError::Upstream`];
//! transport trouble becomes [`AgentError::Transport`].

use crate::error::{AgentError, AgentResult};
use crate::protocol::{Envelope, EnvelopeKind, TaskStatus};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

/// Client half of the agent protocol
#[derive(Clone)]
pub struct AgentClient {
    http: Client,
    sender: String,
}

impl AgentClient {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            sender: sender.into(),
        }
    }

    /// Submit a payload; returns the agent-assigned task id
    pub async fn submit(&self, address: &Url, recipient: &str, input: &str) -> AgentResult<Uuid> {
        let request = Envelope::request(self.sender.as_str(), recipient, input);
        let url = join(address, "tasks")?;

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::transport(e.to_string()))?;

        let envelope = decode(response).await?;
        Ok(envelope.task_id)
    }

    /// Poll the status of a task
    pub async fn status(&self, address: &Url, task_id: Uuid) -> AgentResult<TaskStatus> {
        let url = join(address, &format!("tasks/{task_id}/status"))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AgentError::transport(e.to_string()))?;

        let envelope = decode(response).await?;
        envelope
            .payload
            .parse()
            .map_err(|e| AgentError::transport(format!("bad status payload: {e}")))
    }

    /// Fetch the result of a terminal task
    pub async fn result(&self, address: &Url, task_id: Uuid) -> AgentResult<String> {
        let url = join(address, &format!("tasks/{task_id}/result"))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AgentError::transport(e.to_string()))?;

        let envelope = decode(response).await?;
        Ok(envelope.payload)
    }

    /// Submit `input` and poll until the task is terminal or the deadline
    /// passes, then return its result
    pub async fn run_to_completion(
        &self,
        address: &Url,
        recipient: &str,
        input: &str,
        poll_interval: Duration,
        budget: Duration,
    ) -> AgentResult<String> {
        let task_id = self.submit(address, recipient, input).await?;
        debug!(task_id = %task_id, agent = %recipient, "sub-task submitted");

        let deadline = tokio::time::Instant::now() + budget;
        loop {
            let status = self.status(address, task_id).await?;
            if status.is_terminal() {
                return self.result(address, task_id).await;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AgentError::UpstreamTimeout {
                    agent: address.to_string(),
                    budget_secs: budget.as_secs(),
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

fn join(address: &Url, path: &str) -> AgentResult<Url> {
    address
        .join(path)
        .map_err(|e| AgentError::transport(format!("bad agent address: {e}")))
}

/// Parse a response body into an envelope, surfacing Error envelopes as
/// upstream failures
async fn decode(response: reqwest::Response) -> AgentResult<Envelope> {
    let status = response.status();
    let envelope: Envelope = response
        .json()
        .await
        .map_err(|e| AgentError::transport(format!("undecodable envelope ({status}): {e}")))?;

    match envelope.kind {
        EnvelopeKind::Error => Err(AgentError::upstream(envelope.payload)),
        _ => Ok(envelope),
    }
}
