mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use navigator_client::{NavigatorClient, TransportError};
use navigator_core::test_helpers::{seeded_reconciler, status_json, status_json_with_metrics};
use navigator_core::{AgentState, ConnectionStatus, ReconcileError};

use common::{Frame, TestServer, refused_url, wait_for};

fn client() -> NavigatorClient {
    NavigatorClient::new(seeded_reconciler())
}

#[tokio::test]
async fn streamed_messages_drive_agent_state() {
    let server = TestServer::scripted(vec![
        Frame::Text(status_json("Summarizer", "queued")),
        Frame::Text(status_json_with_metrics(
            "Summarizer",
            "processing",
            "halfway",
            500.0,
            1000.0,
        )),
        Frame::Binary(status_json("Summarizer", "complete").into_bytes()),
    ])
    .await;
    let client = client();
    let mut sub = client.subscribe();

    client.connect(&server.ws_url()).await.unwrap();
    let snapshot = wait_for(&mut sub, |s| {
        s.agent("Summarizer").is_some_and(|a| a.state == AgentState::Done)
    })
    .await;

    let summarizer = snapshot.agent("Summarizer").unwrap();
    assert_eq!(summarizer.findings, vec!["halfway"]);
    assert_eq!(summarizer.progress, 100.0);
    assert_eq!(
        snapshot.connection,
        ConnectionStatus::Connected {
            endpoint: server.ws_url()
        }
    );
    assert_eq!(snapshot.agent("Linker").unwrap().state, AgentState::Idle);
}

#[tokio::test]
async fn progress_is_reported_while_processing() {
    let gate = Arc::new(Notify::new());
    let server = TestServer::scripted(vec![
        Frame::Text(status_json_with_metrics(
            "Linker",
            "processing",
            "linked 3 concepts",
            250.0,
            1000.0,
        )),
        Frame::Wait(Arc::clone(&gate)),
    ])
    .await;
    let client = client();
    let mut sub = client.subscribe();

    client.connect(&server.ws_url()).await.unwrap();
    let snapshot = wait_for(&mut sub, |s| {
        s.agent("Linker")
            .is_some_and(|a| a.state == AgentState::Processing)
    })
    .await;
    assert_eq!(snapshot.agent("Linker").unwrap().progress, 25.0);
}

#[tokio::test]
async fn second_connect_is_rejected() {
    let server = TestServer::idle().await;
    let client = client();

    client.connect(&server.ws_url()).await.unwrap();
    let err = client.connect(&server.ws_url()).await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::Rejected(ReconcileError::AlreadyConnected { .. })
    ));
    assert!(client.snapshot().connection.is_live());
}

#[tokio::test]
async fn empty_endpoint_is_rejected() {
    let client = client();
    let err = client.connect("  ").await.unwrap_err();
    assert!(matches!(
        err,
        TransportError::Rejected(ReconcileError::EmptyEndpoint)
    ));
    assert_eq!(client.snapshot().connection, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn malformed_and_unknown_messages_are_skipped() {
    let server = TestServer::scripted(vec![
        Frame::Text("{not json".to_string()),
        Frame::Text(status_json("Ghost", "processing")),
        Frame::Text(status_json("Linker", "teleporting")),
        Frame::Text(status_json("Linker", "queued")),
    ])
    .await;
    let client = client();
    let mut sub = client.subscribe();

    client.connect(&server.ws_url()).await.unwrap();
    let snapshot = wait_for(&mut sub, |s| {
        s.agent("Linker").is_some_and(|a| a.state == AgentState::Queued)
    })
    .await;

    assert!(snapshot.connection.is_live());
    assert!(snapshot.agent("Ghost").is_none());
    assert_eq!(snapshot.agents.len(), 4);
}

#[tokio::test]
async fn server_close_surfaces_failure_once() {
    let server = TestServer::scripted(vec![
        Frame::Text(status_json("Orchestrator", "queued")),
        Frame::Close("pipeline finished"),
    ])
    .await;
    let client = client();
    let mut sub = client.subscribe();

    client.connect(&server.ws_url()).await.unwrap();
    let snapshot = wait_for(&mut sub, |s| {
        matches!(s.connection, ConnectionStatus::Failed { .. })
    })
    .await;

    let ConnectionStatus::Failed { reason, .. } = &snapshot.connection else {
        unreachable!()
    };
    assert!(reason.contains("pipeline finished"), "{reason}");
    // Agent states survive a transport failure.
    assert_eq!(
        snapshot.agent("Orchestrator").unwrap().state,
        AgentState::Queued
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sub.try_next().is_none(), "failure must be published once");
}

#[tokio::test]
async fn disconnect_discards_later_messages() {
    let gate = Arc::new(Notify::new());
    let server = TestServer::scripted(vec![
        Frame::Text(status_json("Visualizer", "queued")),
        Frame::Wait(Arc::clone(&gate)),
        Frame::Text(status_json("Visualizer", "processing")),
        Frame::Text(status_json("Summarizer", "error")),
    ])
    .await;
    let client = client();
    let mut sub = client.subscribe();

    client.connect(&server.ws_url()).await.unwrap();
    wait_for(&mut sub, |s| {
        s.agent("Visualizer").is_some_and(|a| a.state == AgentState::Queued)
    })
    .await;

    client.disconnect();
    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = client.snapshot();
    assert_eq!(snapshot.connection, ConnectionStatus::Disconnected);
    assert!(snapshot.agents.iter().all(|a| a.state == AgentState::Idle));
}

#[tokio::test]
async fn refused_connection_fails_and_allows_retry() {
    let url = refused_url().await;
    let client = client();

    let err = client.connect(&url).await.unwrap_err();
    assert!(matches!(err, TransportError::Connect { .. }));
    assert!(matches!(
        client.snapshot().connection,
        ConnectionStatus::Failed { ref endpoint, .. } if *endpoint == url
    ));

    let server = TestServer::scripted(vec![Frame::Text(status_json("Linker", "queued"))]).await;
    let mut sub = client.subscribe();
    client.connect(&server.ws_url()).await.unwrap();
    wait_for(&mut sub, |s| {
        s.agent("Linker").is_some_and(|a| a.state == AgentState::Queued)
    })
    .await;
}

#[tokio::test]
async fn reset_after_streaming_restores_idle_table() {
    let server = TestServer::scripted(vec![
        Frame::Text(status_json("Summarizer", "queued")),
        Frame::Text(status_json("Summarizer", "processing")),
    ])
    .await;
    let client = client();
    let mut sub = client.subscribe();

    client.connect(&server.ws_url()).await.unwrap();
    wait_for(&mut sub, |s| {
        s.agent("Summarizer")
            .is_some_and(|a| a.state == AgentState::Processing)
    })
    .await;

    client.reset();
    let after = client.snapshot();
    client.reset();
    assert_eq!(client.snapshot(), after);
    assert!(after.agents.iter().all(|a| a.state == AgentState::Idle && a.findings.is_empty()));
    assert_eq!(after.connection, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn subscribers_see_every_connection_phase() {
    let server = TestServer::idle().await;
    let client = client();
    let mut sub = client.subscribe();

    client.connect(&server.ws_url()).await.unwrap();
    client.disconnect();

    let mut phases = Vec::new();
    while let Some(snapshot) = sub.try_next() {
        phases.push(snapshot.connection);
    }
    assert!(matches!(phases[0], ConnectionStatus::Connecting { .. }));
    assert!(matches!(phases[1], ConnectionStatus::Connected { .. }));
    assert_eq!(phases[2], ConnectionStatus::Disconnected);
}
