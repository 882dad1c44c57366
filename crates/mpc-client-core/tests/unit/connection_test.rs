//! Unit tests for the connection establisher

use crate::support::{Failures, address_of, scripted_client, wait_until};
use mpc_client_core::{ConnectionStatus, Error, SessionEvent};
use std::time::Duration;

#[tokio::test]
async fn test_wallet_bound_after_keygen() {
    let (sdk, client) = scripted_client();

    client.generate_key_share().await.unwrap();
    let wallet = client
        .wait_for_wallet(Duration::from_secs(5))
        .await
        .unwrap();

    let key_share = client.state().key_share().unwrap();
    assert_eq!(wallet.address(), address_of(&key_share));
    assert!(matches!(
        client.state().connection_status(),
        ConnectionStatus::Connected
    ));
    assert_eq!(sdk.connections(), 1);
}

#[tokio::test]
async fn test_connection_failure_emits_event_and_status() {
    let (sdk, client) = scripted_client();
    Failures::set(&sdk.fail.connection, true);
    let mut events = client.subscribe();

    client.generate_key_share().await.unwrap();

    let failed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SessionEvent::ConnectionFailed { generation, error }) = events.recv().await {
                return (generation, error);
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(failed.0, 1);
    assert_eq!(failed.1.kind, "connection_failed");
    assert!(client.state().connection_status().is_failed());
    assert!(client.state().wallet().is_none());

    // Key share and its log lines survive the failure
    assert!(client.state().key_share().is_some());
    assert!(
        client
            .log()
            .last()
            .unwrap()
            .starts_with("connection failed: ")
    );
}

#[tokio::test]
async fn test_wait_for_wallet_reports_connection_failure() {
    let (sdk, client) = scripted_client();
    Failures::set(&sdk.fail.connection, true);

    client.generate_key_share().await.unwrap();
    let result = client.wait_for_wallet(Duration::from_secs(5)).await;

    assert!(matches!(result, Err(Error::ConnectionFailed(_))));
}

#[tokio::test]
async fn test_no_automatic_retry() {
    let (sdk, client) = scripted_client();
    Failures::set(&sdk.fail.connection, true);

    client.generate_key_share().await.unwrap();
    wait_until(|| client.state().connection_status().is_failed()).await;

    Failures::set(&sdk.fail.connection, false);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(sdk.connections(), 1);
    assert!(client.state().wallet().is_none());
}

#[tokio::test]
async fn test_explicit_retry_binds_wallet() {
    let (sdk, client) = scripted_client();
    Failures::set(&sdk.fail.connection, true);

    client.generate_key_share().await.unwrap();
    wait_until(|| client.state().connection_status().is_failed()).await;

    Failures::set(&sdk.fail.connection, false);
    assert!(client.retry_connection().await);

    assert!(client.state().wallet().is_some());
    assert_eq!(sdk.connections(), 2);

    // Nothing left to retry
    assert!(!client.retry_connection().await);
    assert_eq!(sdk.connections(), 2);
}

#[tokio::test]
async fn test_superseded_negotiation_is_discarded() {
    let (sdk, client) = scripted_client();
    sdk.gates.connection.arm();

    client.generate_key_share().await.unwrap();
    sdk.gates.connection.wait_entered().await;

    // Second share arrives while the first negotiation is parked
    client.generate_key_share().await.unwrap();
    let current = client.state().key_share().unwrap();
    sdk.gates.connection.release();

    let wallet = client
        .wait_for_wallet(Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(wallet.address(), address_of(&current));
    assert_eq!(client.state().generation(), 2);
    assert_eq!(sdk.connections(), 2);
}

#[tokio::test]
async fn test_shutdown_stops_binding() {
    let (sdk, client) = scripted_client();
    client.shutdown();
    tokio::task::yield_now().await;

    client.generate_key_share().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(sdk.connections(), 0);
    assert!(client.state().wallet().is_none());
}
