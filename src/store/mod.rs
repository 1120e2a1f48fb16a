//! Per-agent persistent task store
//!
//! Each domain agent owns exactly one store; nothing is shared across
//! agents. Records are JSON-encoded [`Task`] values in a sled tree keyed by
//! task UUID. Updates run inside a sled transaction, which serializes writes
//! to a given task id while leaving distinct ids free to proceed
//! concurrently.

use crate::protocol::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// One unit of work tracked by a domain agent
///
/// `result_text` is set iff the task completed; `error_reason` is set iff it
/// failed. Only the owning agent mutates a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub agent_id: String,
    pub input_text: String,
    pub status: TaskStatus,
    pub result_text: Option<String>,
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unknown task id, or an attempt to update a task that already reached
    /// a terminal status (terminal tasks are never re-opened)
    #[error("task {0} not found")]
    NotFound(Uuid),
    #[error("storage backend error: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode task record: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Append/update log of tasks for one agent
pub struct TaskStore {
    agent_id: String,
    db: sled::Db,
}

impl TaskStore {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>, agent_id: impl Into<String>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            agent_id: agent_id.into(),
            db,
        })
    }

    /// Open an in-memory store that is dropped with the value
    ///
    /// Used by tests and by agents explicitly configured without a data
    /// directory.
    pub fn temporary(agent_id: impl Into<String>) -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            agent_id: agent_id.into(),
            db,
        })
    }

    /// Create a new task in `Submitted` state and persist it
    pub fn create(&self, input_text: &str) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            agent_id: self.agent_id.clone(),
            input_text: input_text.to_string(),
            status: TaskStatus::Submitted,
            result_text: None,
            error_reason: None,
            created_at: now,
            updated_at: now,
        };

        let bytes = serde_json::to_vec(&task)?;
        self.db.insert(task.id.as_bytes().to_vec(), bytes)?;
        self.db.flush()?;
        Ok(task)
    }

    /// Transition a task to `status`, recording `text` as the result when
    /// completing or as the failure reason when failing
    ///
    /// Rejects unknown ids and tasks already in a terminal state with
    /// [`StoreError::NotFound`]; status never regresses.
    pub fn update(
        &self,
        id: Uuid,
        status: TaskStatus,
        text: Option<&str>,
    ) -> Result<Task, StoreError> {
        let result = self.db.transaction(|tx| {
            let key = id.as_bytes().to_vec();
            let bytes = tx
                .get(&key)?
                .ok_or(ConflictableTransactionError::Abort(StoreError::NotFound(id)))?;
            let mut task: Task = serde_json::from_slice(&bytes)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Codec(e)))?;

            if task.status.is_terminal() {
                return Err(ConflictableTransactionError::Abort(StoreError::NotFound(id)));
            }

            task.status = status;
            task.updated_at = Utc::now();
            match status {
                TaskStatus::Completed => task.result_text = text.map(str::to_string),
                TaskStatus::Failed => task.error_reason = text.map(str::to_string),
                TaskStatus::Submitted | TaskStatus::InProgress => {}
            }

            let encoded = serde_json::to_vec(&task)
                .map_err(|e| ConflictableTransactionError::Abort(StoreError::Codec(e)))?;
            tx.insert(key, encoded)?;
            Ok(task)
        });

        let task = result.map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => StoreError::Storage(e),
        })?;
        self.db.flush()?;
        Ok(task)
    }

    /// Fetch a task by id
    pub fn get(&self, id: Uuid) -> Result<Task, StoreError> {
        let bytes = self
            .db
            .get(id.as_bytes())?
            .ok_or(StoreError::NotFound(id))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Number of tasks ever recorded by this store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Whether the store holds no tasks
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    /// Agent owning this store
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }
}
