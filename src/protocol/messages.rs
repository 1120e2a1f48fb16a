//! Protocol message types for the convoy agent mesh
//!
//! Every HTTP request and response body in the mesh is an [`Envelope`].
//! Agents expose three operations on top of it: `submit` (POST /tasks),
//! `getStatus` (GET /tasks/{id}/status) and `getResult`
//! (GET /tasks/{id}/result). Status and result reads are idempotent;
//! `submit` is not — every call creates a new task, and callers wanting
//! exactly-once semantics must track task ids themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Message wrapper exchanged between the orchestrator and domain agents
///
/// On a submit request `task_id` identifies the *message*; the agent mints a
/// fresh task id and returns it in the response envelope's `task_id`. On
/// status/result responses `task_id` is the task being reported on.
///
/// # Examples
/// ```
/// use convoy::protocol::{Envelope, EnvelopeKind};
///
/// let request = Envelope::request("orchestrator", "dispatch", "assign truck 7");
/// assert_eq!(request.kind, EnvelopeKind::Request);
///
/// let json = serde_json::to_string(&request).unwrap();
/// let parsed: Envelope = serde_json::from_str(&json).unwrap();
/// assert_eq!(parsed, request);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Task (or, on submit requests, message) identifier
    pub task_id: Uuid,
    /// Agent id of the sending party
    pub sender: String,
    /// Agent id of the receiving party
    pub recipient: String,
    /// Payload text: input on requests, result/status text on responses,
    /// sanitized error text on errors
    pub payload: String,
    /// Message kind
    pub kind: EnvelopeKind,
}

/// Envelope kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Request,
    Response,
    Error,
}

impl Envelope {
    /// Build a request envelope with a fresh message id
    pub fn request(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            sender: sender.into(),
            recipient: recipient.into(),
            payload: payload.into(),
            kind: EnvelopeKind::Request,
        }
    }

    /// Build a response envelope for a given task
    pub fn response(
        task_id: Uuid,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            sender: sender.into(),
            recipient: recipient.into(),
            payload: payload.into(),
            kind: EnvelopeKind::Response,
        }
    }

    /// Build an error envelope for a given task
    pub fn error(
        task_id: Uuid,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            sender: sender.into(),
            recipient: recipient.into(),
            payload: message.into(),
            kind: EnvelopeKind::Error,
        }
    }
}

/// Lifecycle states of a task
///
/// Transitions are monotonic: `Submitted → InProgress → Completed`, with
/// `Failed` reachable from either non-terminal state. A terminal task is
/// never re-opened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Submitted,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Wire spelling, matching the serde representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Submitted => "submitted",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(TaskStatus::Submitted),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized status string
#[derive(Debug, Clone, thiserror::Error)]
#[error("unrecognized task status: {0}")]
pub struct UnknownStatus(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = Envelope::request("orchestrator", "dispatch", "assign truck 7");

        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, envelope);
        assert_eq!(parsed.sender, "orchestrator");
        assert_eq!(parsed.recipient, "dispatch");
    }

    #[test]
    fn test_envelope_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&EnvelopeKind::Request).unwrap(),
            "\"request\""
        );
        assert_eq!(
            serde_json::to_string(&EnvelopeKind::Response).unwrap(),
            "\"response\""
        );
        assert_eq!(
            serde_json::to_string(&EnvelopeKind::Error).unwrap(),
            "\"error\""
        );
    }

    #[test]
    fn test_response_preserves_task_id() {
        let task_id = Uuid::new_v4();
        let envelope = Envelope::response(task_id, "dispatch", "orchestrator", "done");

        assert_eq!(envelope.task_id, task_id);
        assert_eq!(envelope.kind, EnvelopeKind::Response);
    }

    #[test]
    fn test_error_envelope() {
        let task_id = Uuid::new_v4();
        let envelope = Envelope::error(task_id, "dispatch", "orchestrator", "task not found");

        assert_eq!(envelope.kind, EnvelopeKind::Error);
        assert_eq!(envelope.payload, "task not found");
    }

    #[test]
    fn test_status_terminality() {
        assert!(!TaskStatus::Submitted.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_wire_spelling_roundtrip() {
        for status in [
            TaskStatus::Submitted,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed: TaskStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);

            // serde representation must match as_str so envelope payloads
            // and stored records agree
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert!("cancelled".parse::<TaskStatus>().is_err());
        assert!("SUBMITTED".parse::<TaskStatus>().is_err());
    }
}
