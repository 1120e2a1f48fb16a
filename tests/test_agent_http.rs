//! Integration tests for the domain agent's HTTP protocol surface
//!
//! Drives a real warp server over loopback: submit, poll, fetch, and the
//! error envelopes for unknown ids and malformed requests.


use convoy::protocol::{Envelope, EnvelopeKind, TaskStatus};
use std::time::Duration;
use uuid::Uuid;

async fn poll_until_terminal(base: &url::Url, task_id: Uuid) -> TaskStatus {
    let client = reqwest::Client::new();
    for _ in 0..200 {
        let envelope: Envelope = client
            .get(base.join(&format!("tasks/{task_id}/status")).unwrap())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let status: TaskStatus = envelope.payload.parse().unwrap();
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never reached a terminal state");
}

#[tokio::test]
async fn test_submit_poll_result_echo_round_trip() {
    let base = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));
    let client = reqwest::Client::new();

    // submit
    let request = Envelope::request("test-caller", "dispatch", "assign truck 7");
    let response = client
        .post(base.join("tasks").unwrap())
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let submitted: Envelope = response.json().await.unwrap();
    assert_eq!(submitted.kind, EnvelopeKind::Response);
    assert_eq!(submitted.sender, "dispatch");
    assert_eq!(submitted.recipient, "test-caller");
    assert_eq!(submitted.payload, "submitted");

    // poll to terminal
    let status = poll_until_terminal(&base, submitted.task_id).await;
    assert_eq!(status, TaskStatus::Completed);

    // fetch result: echo-only agent answers the input verbatim
    let result: Envelope = client
        .get(base
            .join(&format!("tasks/{}/result", submitted.task_id))
            .unwrap())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result.kind, EnvelopeKind::Response);
    assert_eq!(result.payload, "assign truck 7");
}

#[tokio::test]
async fn test_each_submit_creates_a_new_task() {
    let base = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));
    let client = reqwest::Client::new();

    let mut task_ids = Vec::new();
    for _ in 0..3 {
        let request = Envelope::request("test-caller", "dispatch", "same payload");
        let submitted: Envelope = client
            .post(base.join("tasks").unwrap())
            .json(&request)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        task_ids.push(submitted.task_id);
    }

    task_ids.sort();
    task_ids.dedup();
    assert_eq!(task_ids.len(), 3);
}

#[tokio::test]
async fn test_unknown_task_yields_404_error_envelope() {
    let base = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));
    let client = reqwest::Client::new();
    let unknown = Uuid::new_v4();

    for path in [
        format!("tasks/{unknown}/status"),
        format!("tasks/{unknown}/result"),
    ] {
        let response = client.get(base.join(&path).unwrap()).send().await.unwrap();
        assert_eq!(response.status(), 404);

        let envelope: Envelope = response.json().await.unwrap();
        assert_eq!(envelope.kind, EnvelopeKind::Error);
        assert_eq!(envelope.task_id, unknown);
        assert!(envelope.payload.contains("not found"));
    }
}

#[tokio::test]
async fn test_submit_rejects_non_request_envelope() {
    let base = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));

    let not_a_request = Envelope::response(Uuid::new_v4(), "caller", "dispatch", "payload");
    let response = reqwest::Client::new()
        .post(base.join("tasks").unwrap())
        .json(&not_a_request)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let envelope: Envelope = response.json().await.unwrap();
    assert_eq!(envelope.kind, EnvelopeKind::Error);
}

#[tokio::test]
async fn test_malformed_body_yields_error_envelope() {
    let base = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));

    let response = reqwest::Client::new()
        .post(base.join("tasks").unwrap())
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let envelope: Envelope = response.json().await.unwrap();
    assert_eq!(envelope.kind, EnvelopeKind::Error);
    assert!(envelope.payload.contains("malformed"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = test_helpers::spawn_agent(test_helpers::echo_agent(
        "delivery",
        "Tracks shipment status",
    ));

    let response = reqwest::Client::new()
        .get(base.join("health").unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["agent_id"], "delivery");
}
