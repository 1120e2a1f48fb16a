//! Wire contract shared by the orchestrator and every domain agent
//!
//! Defines the JSON envelope exchanged over HTTP and the task status
//! vocabulary. This is the only code two convoy processes must agree on;
//! everything else is private to each agent.

pub mod messages;

pub use messages::*;
