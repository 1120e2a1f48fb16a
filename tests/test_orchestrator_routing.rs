//! Integration tests for orchestrator routing and aggregation
//!
//! Real domain agents run on loopback; a stalling wiremock double stands in
//! for an agent that never finishes. Covers the echo round trip through the
//! mesh, aggregation order, and visible partial failure.


use convoy::orchestrator::{
    service, AgentClient, KeywordClassifier, Orchestrator, RoutingEntry, RoutingPolicy,
    RoutingTable,
};
use convoy::protocol::{Envelope, EnvelopeKind};
use convoy::providers::ProviderKind;
use convoy::testing::mocks::{FixedClassifier, MockProvider};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy() -> RoutingPolicy {
    RoutingPolicy {
        poll_interval: Duration::from_millis(20),
        agent_timeout: Duration::from_secs(5),
        overall_timeout: Duration::from_secs(10),
        no_handler_reply: "unable to route request".to_string(),
    }
}

fn table(entries: &[(&str, &Url)]) -> RoutingTable {
    RoutingTable::new(
        entries
            .iter()
            .map(|(intent, address)| RoutingEntry {
                intent: intent.to_string(),
                address: (*address).clone(),
            })
            .collect(),
    )
}

/// Agent double that accepts submissions but never reaches a terminal state
async fn stalling_agent(agent_id: &str) -> MockServer {
    let server = MockServer::start().await;

    let submitted = Envelope::response(Uuid::new_v4(), agent_id, "orchestrator", "submitted");
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&submitted))
        .mount(&server)
        .await;

    let in_progress = Envelope::response(Uuid::new_v4(), agent_id, "caller", "in_progress");
    Mock::given(method("GET"))
        .and(path_regex(r"^/tasks/[0-9a-f-]+/status$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&in_progress))
        .mount(&server)
        .await;

    server
}

#[tokio::test]
async fn test_echo_round_trip_through_the_mesh() {
    // dispatch agent with no generative providers: full echo round trip
    let dispatch = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));

    let classifier = KeywordClassifier::new(vec![(
        "dispatch".to_string(),
        vec!["truck".to_string(), "vehicle".to_string()],
    )]);
    let orchestrator = Orchestrator::new(
        "orchestrator",
        table(&[("dispatch", &dispatch)]),
        Arc::new(classifier),
        fast_policy(),
    );

    let reply = orchestrator.handle_message("assign truck 7").await;
    assert_eq!(reply, "assign truck 7");
}

#[tokio::test]
async fn test_no_matched_intent_answers_no_handler_reply() {
    let orchestrator = Orchestrator::new(
        "orchestrator",
        table(&[]),
        Arc::new(FixedClassifier::new(&[])),
        fast_policy(),
    );

    let reply = orchestrator.handle_message("good morning").await;
    assert_eq!(reply, "unable to route request");
}

#[tokio::test]
async fn test_multi_intent_aggregates_in_table_order() {
    let dispatch = test_helpers::spawn_agent(test_helpers::agent_with_plan(
        "dispatch",
        "Manages vehicle assignments",
        vec![Box::new(MockProvider::succeeding(ProviderKind::Primary, "A"))],
    ));
    let delivery = test_helpers::spawn_agent(test_helpers::agent_with_plan(
        "delivery",
        "Tracks shipment status",
        vec![Box::new(MockProvider::succeeding(ProviderKind::Primary, "B"))],
    ));

    let orchestrator = Orchestrator::new(
        "orchestrator",
        table(&[("dispatch", &dispatch), ("delivery", &delivery)]),
        Arc::new(FixedClassifier::new(&["dispatch", "delivery"])),
        fast_policy(),
    );

    let reply = orchestrator
        .handle_message("dispatch a truck and track the shipment")
        .await;
    assert_eq!(reply, "dispatch: A\ndelivery: B");
}

#[tokio::test]
async fn test_partial_failure_reports_marker_and_keeps_sibling() {
    let dispatch = test_helpers::spawn_agent(test_helpers::agent_with_plan(
        "dispatch",
        "Manages vehicle assignments",
        vec![Box::new(MockProvider::succeeding(ProviderKind::Primary, "A"))],
    ));
    let stalled = stalling_agent("delivery").await;
    let stalled_url: Url = stalled.uri().parse().unwrap();

    let orchestrator = Orchestrator::new(
        "orchestrator",
        table(&[("dispatch", &dispatch), ("delivery", &stalled_url)]),
        Arc::new(FixedClassifier::new(&["dispatch", "delivery"])),
        RoutingPolicy {
            poll_interval: Duration::from_millis(20),
            agent_timeout: Duration::from_millis(300),
            overall_timeout: Duration::from_secs(5),
            no_handler_reply: "unable to route request".to_string(),
        },
    );

    let reply = orchestrator
        .handle_message("dispatch a truck and track the shipment")
        .await;

    let lines: Vec<&str> = reply.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "dispatch: A");
    assert!(lines[1].starts_with("delivery: [failed:"), "got: {reply}");
}

#[tokio::test]
async fn test_unreachable_agent_is_a_visible_failure() {
    let dispatch = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));
    // nothing listens here
    let dead: Url = "http://127.0.0.1:1".parse().unwrap();

    let orchestrator = Orchestrator::new(
        "orchestrator",
        table(&[("dispatch", &dispatch), ("inbound", &dead)]),
        Arc::new(FixedClassifier::new(&["dispatch", "inbound"])),
        fast_policy(),
    );

    let reply = orchestrator.handle_message("log the pallet").await;
    assert!(reply.contains("dispatch: log the pallet"));
    assert!(reply.contains("inbound: [failed:"));
}

#[tokio::test]
async fn test_orchestrator_http_service() {
    let dispatch = test_helpers::spawn_agent(test_helpers::echo_agent(
        "dispatch",
        "Manages vehicle assignments",
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        "orchestrator",
        table(&[("dispatch", &dispatch)]),
        Arc::new(FixedClassifier::new(&["dispatch"])),
        fast_policy(),
    ));

    let (addr, server) = service::bind(orchestrator, ([127, 0, 0, 1], 0).into());
    tokio::spawn(server);
    let base: Url = format!("http://{addr}").parse().unwrap();

    let request = Envelope::request("chat-ui", "orchestrator", "assign truck 7");
    let response = reqwest::Client::new()
        .post(base.join("messages").unwrap())
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let reply: Envelope = response.json().await.unwrap();
    assert_eq!(reply.kind, EnvelopeKind::Response);
    assert_eq!(reply.task_id, request.task_id);
    assert_eq!(reply.recipient, "chat-ui");
    assert_eq!(reply.payload, "assign truck 7");
}

#[tokio::test]
async fn test_client_times_out_on_stalled_agent() {
    let stalled = stalling_agent("delivery").await;
    let url: Url = stalled.uri().parse().unwrap();

    let client = AgentClient::new("test-caller");
    let err = client
        .run_to_completion(
            &url,
            "delivery",
            "track shipment 9",
            Duration::from_millis(20),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("did not finish"));
}
