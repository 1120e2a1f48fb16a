//! convoy - HTTP agent-to-agent task routing mesh
//!
//! A small set of autonomous logistics agents (vehicle dispatch, delivery
//! tracking, inventory intake) coordinated by a single orchestrator. Agents
//! exchange JSON task envelopes over HTTP; each domain agent tracks its own
//! tasks in a private store and produces replies through a fixed provider
//! fallback chain (hosted API, then local model server, then deterministic
//! echo).
//!
//! # Quick Start
//!
//! ```rust
//! use convoy::protocol::{Envelope, EnvelopeKind, TaskStatus};
//!
//! // A caller submits work as a request envelope
//! let request = Envelope::request("orchestrator", "dispatch", "assign truck 7");
//! assert_eq!(request.kind, EnvelopeKind::Request);
//!
//! // Agents answer with response envelopes carrying the task id
//! let reply = Envelope::response(request.task_id, "dispatch", "orchestrator", "submitted");
//! let json = serde_json::to_string(&reply).unwrap();
//! assert!(json.contains("\"response\""));
//!
//! // Tasks move Submitted -> InProgress -> Completed (or Failed)
//! assert!(!TaskStatus::Submitted.is_terminal());
//! assert!(TaskStatus::Completed.is_terminal());
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod observability;
pub mod orchestrator;
pub mod protocol;
pub mod providers;
pub mod store;
pub mod testing;

pub use agent::DomainAgent;
pub use config::{AgentConfig, OrchestratorConfig};
pub use error::{AgentError, AgentResult};
pub use orchestrator::Orchestrator;
pub use protocol::*;
pub use providers::{ProviderChain, ProviderKind, ProviderResult};
pub use store::{Task, TaskStore};
