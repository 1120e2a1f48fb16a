//! HTTP face of a domain agent
//!
//! Exposes the protocol operations over warp: `POST /tasks` submits a
//! payload, `GET /tasks/{id}/status` and `GET /tasks/{id}/result` poll it,
//! `GET /health` reports liveness. Every response body is a protocol
//! [`Envelope`] except the health report; errors are Error envelopes, never
//! raw traces.

use crate::agent::DomainAgent;
use crate::error::AgentError;
use crate::protocol::{Envelope, EnvelopeKind};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Assemble the agent's route tree
pub fn routes(
    agent: Arc<DomainAgent>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let recover_agent = agent.clone();
    let with_agent = warp::any().map(move || agent.clone());

    let submit = warp::path("tasks")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_agent.clone())
        .and_then(handle_submit);

    let status = warp::path!("tasks" / Uuid / "status")
        .and(warp::get())
        .and(with_agent.clone())
        .and_then(handle_status);

    let result = warp::path!("tasks" / Uuid / "result")
        .and(warp::get())
        .and(with_agent.clone())
        .and_then(handle_result);

    let health = warp::path("health")
        .and(warp::get())
        .and(with_agent.clone())
        .and_then(handle_health);

    submit
        .or(status)
        .or(result)
        .or(health)
        .recover(move |rejection| handle_rejection(rejection, recover_agent.clone()))
}

/// Bind the service, returning the bound address and the server future
///
/// Accepts port 0 for an ephemeral port; tests rely on that.
pub fn bind(
    agent: Arc<DomainAgent>,
    addr: SocketAddr,
) -> (SocketAddr, impl Future<Output = ()>) {
    warp::serve(routes(agent)).bind_ephemeral(addr)
}

/// Bind the service with a graceful-shutdown signal
pub fn bind_with_shutdown(
    agent: Arc<DomainAgent>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> (SocketAddr, impl Future<Output = ()>) {
    warp::serve(routes(agent)).bind_with_graceful_shutdown(addr, shutdown)
}

async fn handle_submit(
    envelope: Envelope,
    agent: Arc<DomainAgent>,
) -> Result<impl Reply, Infallible> {
    if envelope.kind != EnvelopeKind::Request {
        let reply = Envelope::error(
            envelope.task_id,
            agent.id(),
            envelope.sender,
            "submit expects a request envelope",
        );
        return Ok(warp::reply::with_status(
            warp::reply::json(&reply),
            StatusCode::BAD_REQUEST,
        ));
    }

    match agent.handle_submit(envelope.payload) {
        Ok(task_id) => {
            let reply = Envelope::response(task_id, agent.id(), envelope.sender, "submitted");
            Ok(warp::reply::with_status(
                warp::reply::json(&reply),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            let (code, reply) = error_reply(&agent, envelope.task_id, envelope.sender, &e);
            Ok(warp::reply::with_status(warp::reply::json(&reply), code))
        }
    }
}

async fn handle_status(
    task_id: Uuid,
    agent: Arc<DomainAgent>,
) -> Result<impl Reply, Infallible> {
    match agent.status(task_id) {
        Ok(status) => {
            let reply = Envelope::response(task_id, agent.id(), "caller", status.as_str());
            Ok(warp::reply::with_status(
                warp::reply::json(&reply),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            let (code, reply) = error_reply(&agent, task_id, "caller".to_string(), &e);
            Ok(warp::reply::with_status(warp::reply::json(&reply), code))
        }
    }
}

async fn handle_result(
    task_id: Uuid,
    agent: Arc<DomainAgent>,
) -> Result<impl Reply, Infallible> {
    match agent.result(task_id) {
        Ok(text) => {
            let reply = Envelope::response(task_id, agent.id(), "caller", text);
            Ok(warp::reply::with_status(
                warp::reply::json(&reply),
                StatusCode::OK,
            ))
        }
        Err(e) => {
            let (code, reply) = error_reply(&agent, task_id, "caller".to_string(), &e);
            Ok(warp::reply::with_status(warp::reply::json(&reply), code))
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    agent_id: String,
    description: String,
    tasks_recorded: usize,
}

async fn handle_health(agent: Arc<DomainAgent>) -> Result<impl Reply, Infallible> {
    let report = HealthReport {
        status: "healthy",
        agent_id: agent.id().to_string(),
        description: agent.description().to_string(),
        tasks_recorded: agent.store().len(),
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&report),
        StatusCode::OK,
    ))
}

/// Map a domain error onto an HTTP status plus Error envelope
///
/// A Failed task's result is reported 200 with an Error envelope: the
/// protocol exchange succeeded, the task did not.
fn error_reply(
    agent: &DomainAgent,
    task_id: Uuid,
    recipient: String,
    error: &AgentError,
) -> (StatusCode, Envelope) {
    let code = match error {
        AgentError::NotFound(_) => StatusCode::NOT_FOUND,
        AgentError::NotTerminal(_) => StatusCode::CONFLICT,
        AgentError::Upstream(_) => StatusCode::OK,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (code, error.to_error_envelope(task_id, agent.id(), recipient))
}

async fn handle_rejection(
    rejection: Rejection,
    agent: Arc<DomainAgent>,
) -> Result<impl Reply, Infallible> {
    let (code, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "no such endpoint")
    } else if rejection
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
    {
        (StatusCode::BAD_REQUEST, "malformed envelope")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    } else {
        info!(?rejection, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    };

    let reply = Envelope::error(Uuid::nil(), agent.id(), "caller", message);
    Ok(warp::reply::with_status(warp::reply::json(&reply), code))
}
