//! HTTP face of the orchestrator
//!
//! `POST /messages` accepts a request envelope, routes it, and answers 200
//! with a response envelope carrying the aggregated reply — partial failure
//! is reply text, not an HTTP error. `GET /health` reports liveness and the
//! routing table size.

use crate::orchestrator::Orchestrator;
use crate::protocol::{Envelope, EnvelopeKind};
use serde::Serialize;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Assemble the orchestrator's route tree
pub fn routes(
    orchestrator: Arc<Orchestrator>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let recover_orchestrator = orchestrator.clone();
    let with_orchestrator = warp::any().map(move || orchestrator.clone());

    let messages = warp::path("messages")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::json())
        .and(with_orchestrator.clone())
        .and_then(handle_message);

    let health = warp::path("health")
        .and(warp::get())
        .and(with_orchestrator.clone())
        .and_then(handle_health);

    messages
        .or(health)
        .recover(move |rejection| handle_rejection(rejection, recover_orchestrator.clone()))
}

/// Bind the service, returning the bound address and the server future
pub fn bind(
    orchestrator: Arc<Orchestrator>,
    addr: SocketAddr,
) -> (SocketAddr, impl Future<Output = ()>) {
    warp::serve(routes(orchestrator)).bind_ephemeral(addr)
}

/// Bind the service with a graceful-shutdown signal
pub fn bind_with_shutdown(
    orchestrator: Arc<Orchestrator>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> (SocketAddr, impl Future<Output = ()>) {
    warp::serve(routes(orchestrator)).bind_with_graceful_shutdown(addr, shutdown)
}

async fn handle_message(
    envelope: Envelope,
    orchestrator: Arc<Orchestrator>,
) -> Result<impl Reply, Infallible> {
    if envelope.kind != EnvelopeKind::Request {
        let reply = Envelope::error(
            envelope.task_id,
            orchestrator.id(),
            envelope.sender,
            "messages expects a request envelope",
        );
        return Ok(warp::reply::with_status(
            warp::reply::json(&reply),
            StatusCode::BAD_REQUEST,
        ));
    }

    let aggregated = orchestrator.handle_message(&envelope.payload).await;
    let reply = Envelope::response(
        envelope.task_id,
        orchestrator.id(),
        envelope.sender,
        aggregated,
    );
    Ok(warp::reply::with_status(
        warp::reply::json(&reply),
        StatusCode::OK,
    ))
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    orchestrator_id: String,
    routed_agents: usize,
}

async fn handle_health(orchestrator: Arc<Orchestrator>) -> Result<impl Reply, Infallible> {
    let report = HealthReport {
        status: "healthy",
        orchestrator_id: orchestrator.id().to_string(),
        routed_agents: orchestrator.table().entries().len(),
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&report),
        StatusCode::OK,
    ))
}

async fn handle_rejection(
    rejection: Rejection,
    orchestrator: Arc<Orchestrator>,
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
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    };

    let reply = Envelope::error(Uuid::nil(), orchestrator.id(), "caller", message);
    Ok(warp::reply::with_status(warp::reply::json(&reply), code))
}
