//! Domain agent: task state machine over one store and one provider chain
//!
//! A domain agent accepts submitted payloads, tracks each as a [`Task`]
//! through `Submitted → InProgress → Completed` (or `Failed` on storage
//! trouble), and answers status/result polls. Submission returns the task id
//! immediately; the provider chain runs on a spawned tokio task, so many
//! tasks can be in flight at once while the store serializes writes per id.

pub mod service;

use crate::error::{AgentError, AgentResult};
use crate::protocol::TaskStatus;
use crate::providers::ProviderChain;
use crate::store::{StoreError, TaskStore};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// One domain agent instance
pub struct DomainAgent {
    id: String,
    description: String,
    store: Arc<TaskStore>,
    chain: Arc<ProviderChain>,
}

impl DomainAgent {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        store: TaskStore,
        chain: ProviderChain,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            store: Arc::new(store),
            chain: Arc::new(chain),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Accept a payload: persist it as a new task and kick off processing
    ///
    /// Returns the fresh task id as soon as the record exists; callers poll
    /// [`status`](Self::status) and [`result`](Self::result) for the
    /// outcome. Every call creates a new task — submission is not
    /// idempotent.
    #[tracing::instrument(name = "handle_submit", skip(self, input_text))]
    pub fn handle_submit(&self, input_text: String) -> AgentResult<Uuid> {
        let task = self.store.create(&input_text)?;
        info!(task_id = %task.id, agent_id = %self.id, "task submitted");

        let store = self.store.clone();
        let chain = self.chain.clone();
        let task_id = task.id;
        tokio::spawn(async move {
            Self::process(store, chain, task_id, input_text).await;
        });

        Ok(task_id)
    }

    /// Drive one task to a terminal state
    async fn process(store: Arc<TaskStore>, chain: Arc<ProviderChain>, task_id: Uuid, input: String) {
        if let Err(e) = store.update(task_id, TaskStatus::InProgress, None) {
            warn!(task_id = %task_id, error = %e, "could not mark task in progress");
            Self::mark_failed(&store, task_id, &e);
            return;
        }

        let produced = chain.generate(&input).await;
        info!(
            task_id = %task_id,
            provider = %produced.provider,
            response_length = produced.text.len(),
            "provider chain produced reply"
        );

        if let Err(e) = store.update(task_id, TaskStatus::Completed, Some(&produced.text)) {
            error!(task_id = %task_id, error = %e, "could not persist task result");
            Self::mark_failed(&store, task_id, &e);
        }
    }

    /// Best-effort transition to Failed with the reason recorded
    fn mark_failed(store: &TaskStore, task_id: Uuid, reason: &StoreError) {
        if let Err(e) = store.update(task_id, TaskStatus::Failed, Some(&reason.to_string())) {
            error!(task_id = %task_id, error = %e, "could not record task failure");
        }
    }

    /// Current status of a task
    pub fn status(&self, task_id: Uuid) -> AgentResult<TaskStatus> {
        match self.store.get(task_id) {
            Ok(task) => Ok(task.status),
            Err(StoreError::NotFound(id)) => Err(AgentError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Result text of a completed task
    ///
    /// Fails with [`AgentError::NotFound`] for unknown ids,
    /// [`AgentError::Upstream`] carrying the recorded reason for failed
    /// tasks, and [`AgentError::NotTerminal`] while processing is still in
    /// flight.
    pub fn result(&self, task_id: Uuid) -> AgentResult<String> {
        let task = match self.store.get(task_id) {
            Ok(task) => task,
            Err(StoreError::NotFound(id)) => return Err(AgentError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };

        match task.status {
            TaskStatus::Completed => Ok(task.result_text.unwrap_or_default()),
            TaskStatus::Failed => Err(AgentError::upstream(
                task.error_reason
                    .unwrap_or_else(|| "task failed without a recorded reason".to_string()),
            )),
            TaskStatus::Submitted | TaskStatus::InProgress => {
                Err(AgentError::NotTerminal(task_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ProviderError, ProviderKind};
    use crate::testing::mocks::MockProvider;
    use std::time::Duration;

    fn echo_agent() -> DomainAgent {
        DomainAgent::new(
            "dispatch",
            "Manages vehicle assignments",
            TaskStore::temporary("dispatch").unwrap(),
            ProviderChain::from_plan(vec![], Duration::from_secs(1)),
        )
    }

    async fn await_terminal(agent: &DomainAgent, task_id: Uuid) -> TaskStatus {
        for _ in 0..200 {
            let status = agent.status(task_id).unwrap();
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {task_id} never reached a terminal state");
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let agent = echo_agent();
        let task_id = agent.handle_submit("assign truck 7".to_string()).unwrap();

        let status = await_terminal(&agent, task_id).await;
        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(agent.result(task_id).unwrap(), "assign truck 7");
    }

    #[tokio::test]
    async fn test_provider_reply_becomes_result() {
        let agent = DomainAgent::new(
            "delivery",
            "Tracks shipment status",
            TaskStore::temporary("delivery").unwrap(),
            ProviderChain::from_plan(
                vec![Box::new(MockProvider::succeeding(
                    ProviderKind::Primary,
                    "shipment 9 is en route",
                ))],
                Duration::from_secs(1),
            ),
        );

        let task_id = agent.handle_submit("where is shipment 9".to_string()).unwrap();
        await_terminal(&agent, task_id).await;

        assert_eq!(agent.result(task_id).unwrap(), "shipment 9 is en route");
    }

    #[tokio::test]
    async fn test_provider_failure_still_completes_via_echo() {
        let agent = DomainAgent::new(
            "inbound",
            "Handles inventory intake",
            TaskStore::temporary("inbound").unwrap(),
            ProviderChain::from_plan(
                vec![Box::new(MockProvider::failing(
                    ProviderKind::Primary,
                    ProviderError::Network("refused".to_string()),
                ))],
                Duration::from_secs(1),
            ),
        );

        let task_id = agent.handle_submit("weigh pallet 12".to_string()).unwrap();
        let status = await_terminal(&agent, task_id).await;

        assert_eq!(status, TaskStatus::Completed);
        assert_eq!(agent.result(task_id).unwrap(), "weigh pallet 12");
    }

    #[tokio::test]
    async fn test_status_of_unknown_task() {
        let agent = echo_agent();
        let err = agent.status(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_result_of_unknown_task() {
        let agent = echo_agent();
        let err = agent.result(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AgentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_submissions_create_distinct_tasks() {
        let agent = echo_agent();
        let a = agent.handle_submit("same text".to_string()).unwrap();
        let b = agent.handle_submit("same text".to_string()).unwrap();

        assert_ne!(a, b);
        assert_eq!(await_terminal(&agent, a).await, TaskStatus::Completed);
        assert_eq!(await_terminal(&agent, b).await, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_all_complete() {
        let agent = Arc::new(echo_agent());
        let mut ids = Vec::new();
        for i in 0..16 {
            ids.push(agent.handle_submit(format!("message {i}")).unwrap());
        }

        for (i, id) in ids.into_iter().enumerate() {
            await_terminal(&agent, id).await;
            assert_eq!(agent.result(id).unwrap(), format!("message {i}"));
        }
    }
}
