//! Integration tests for the full demo flow
//!
//! These tests drive `MpcClient` against `LocalMpcSdk`:
//! - Sign in -> key share -> wallet -> send
//! - Ledger settlement of the half-balance transfer
//! - Custom configuration
//! - Session teardown when the key share is replaced

use crate::support::wait_until;
use alloy_primitives::U256;
use mpc_client_core::config::DEFAULT_RECEIVER;
use mpc_client_core::sdk::local::eth_address;
use mpc_client_core::{
    ClientConfig, Credentials, Error, KeygenOutcome, LocalMpcSdk, LocalSdkConfig, MpcClient,
    NetworkConfig, SendOutcome, TransactionRequest,
};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn local_client(sdk: &LocalMpcSdk, config: ClientConfig) -> MpcClient {
    MpcClient::new(Arc::new(sdk.clone()), config).unwrap()
}

#[tokio::test]
async fn test_full_demo_flow() {
    let sdk = LocalMpcSdk::new();
    let client = local_client(&sdk, ClientConfig::default());

    client.sign_in().await.unwrap();
    let KeygenOutcome::Generated { public_key, .. } = client.generate_key_share().await.unwrap()
    else {
        panic!("key generation failed");
    };

    let wallet = client.wait_for_wallet(WAIT).await.unwrap();
    let key_share = client.state().key_share().unwrap();
    assert_eq!(public_key, key_share.public_key_hex());
    assert_eq!(wallet.address(), eth_address(&key_share.public_key).unwrap());

    sdk.fund(wallet.address(), U256::from(100u64));
    let outcome = client.send_ethereum_transaction().await.unwrap();

    let SendOutcome::Sent { tx, amount } = outcome else {
        panic!("expected a broadcast");
    };
    assert_eq!(amount, U256::from(50u64));
    assert_eq!(sdk.balance_of(wallet.address()), U256::from(50u64));
    assert_eq!(sdk.balance_of(DEFAULT_RECEIVER), U256::from(50u64));
    assert_eq!(
        tx.explorer_url.as_deref(),
        Some(format!("https://sepolia.etherscan.io/tx/{}", tx.hash).as_str())
    );

    assert_eq!(
        client.log().lines(),
        vec![
            "signed in as test user".to_string(),
            "generating local key share (2 out of 2)...".to_string(),
            format!("local key share generated: {}", public_key),
            format!("sending 50 to {}", DEFAULT_RECEIVER),
            format!("SENT!!! tx: {}", tx.hash),
        ]
    );

    let stats = sdk.stats();
    assert_eq!(stats.sign_ins, 1);
    assert_eq!(stats.key_shares, 1);
    assert_eq!(stats.connections, 1);
    assert_eq!(stats.broadcasts, 1);
}

#[tokio::test]
async fn test_repeated_sends_halve_each_time() {
    let sdk = LocalMpcSdk::new();
    let client = local_client(&sdk, ClientConfig::default());

    client.generate_key_share().await.unwrap();
    let wallet = client.wait_for_wallet(WAIT).await.unwrap();
    sdk.fund(wallet.address(), U256::from(8u64));

    for expected_left in [4u64, 2, 1] {
        client.send_ethereum_transaction().await.unwrap();
        assert_eq!(sdk.balance_of(wallet.address()), U256::from(expected_left));
    }

    // One wei left: nothing more to send
    let outcome = client.send_ethereum_transaction().await.unwrap();
    assert!(matches!(outcome, SendOutcome::NoFunds { .. }));
    assert_eq!(sdk.transfers().len(), 3);
    assert_eq!(sdk.balance_of(DEFAULT_RECEIVER), U256::from(7u64));
}

#[tokio::test]
async fn test_unfunded_wallet_reports_no_funds() {
    let sdk = LocalMpcSdk::new();
    let client = local_client(&sdk, ClientConfig::default());

    client.generate_key_share().await.unwrap();
    let wallet = client.wait_for_wallet(WAIT).await.unwrap();

    client.send_ethereum_transaction().await.unwrap();

    assert_eq!(
        client.log().last().unwrap(),
        format!("no funds on address: {}", wallet.address())
    );
    assert!(sdk.transfers().is_empty());
}

#[tokio::test]
async fn test_closed_session_surfaces_as_send_error() {
    let sdk = LocalMpcSdk::new();
    let client = local_client(&sdk, ClientConfig::default());

    client.generate_key_share().await.unwrap();
    let wallet = client.wait_for_wallet(WAIT).await.unwrap();
    sdk.fund(wallet.address(), U256::from(100u64));

    // Signing party restarts and forgets every session
    assert_eq!(sdk.disconnect_all(), 1);
    let lines_before = client.log().len();

    let outcome = client.send_ethereum_transaction().await.unwrap();

    let SendOutcome::Failed { error } = outcome else {
        panic!("expected failure");
    };
    assert_eq!(error.kind, "connection_failed");

    let lines = client.log().lines();
    assert_eq!(lines[lines_before..].len(), 3);
    assert_eq!(lines[lines_before + 1], "ERROR!!!");
    assert!(lines[lines_before + 2].contains("\"kind\":\"connection_failed\""));

    // Nothing moved and the wallet handle is still bound
    assert_eq!(sdk.balance_of(wallet.address()), U256::from(100u64));
    assert_eq!(
        client.state().wallet().unwrap().address(),
        wallet.address()
    );
}

#[tokio::test]
async fn test_custom_credentials_and_receiver() {
    let credentials = Credentials::new("operator@example.com", "s3cret");
    let sdk = LocalMpcSdk::with_config(LocalSdkConfig::default().with_account(credentials.clone()));
    let receiver = "0x1111111111111111111111111111111111111111";
    let config = ClientConfig::default()
        .with_credentials(credentials)
        .with_receiver(receiver);
    let client = local_client(&sdk, config);

    client.sign_in().await.unwrap();
    assert_eq!(
        client.log().lines(),
        vec!["signed in as operator@example.com"]
    );
    assert_eq!(sdk.signed_in_as().as_deref(), Some("operator@example.com"));

    client.generate_key_share().await.unwrap();
    let wallet = client.wait_for_wallet(WAIT).await.unwrap();
    sdk.fund(wallet.address(), U256::from(1_000u64));
    client.send_ethereum_transaction().await.unwrap();

    assert_eq!(sdk.balance_of(receiver), U256::from(500u64));
}

#[tokio::test]
async fn test_wrong_password_is_reported() {
    let sdk = LocalMpcSdk::new();
    let config = ClientConfig::default()
        .with_credentials(Credentials::new("mpc-lib-test@example.com", "654321"));
    let client = local_client(&sdk, config);

    let result = client.sign_in().await;

    assert!(matches!(result, Err(Error::AuthFailed(_))));
    assert!(client.log().is_empty());
    assert!(!client.snapshot().session.signed_in);
}

#[tokio::test]
async fn test_server_requiring_auth_rejects_keygen_before_sign_in() {
    let sdk = LocalMpcSdk::with_config(LocalSdkConfig::default().with_required_auth(true));
    let client = local_client(&sdk, ClientConfig::default());

    let outcome = client.generate_key_share().await.unwrap();
    assert!(matches!(
        outcome,
        KeygenOutcome::Failed { ref error } if error.kind == "unauthorized"
    ));
    assert!(client.state().key_share().is_none());

    client.sign_in().await.unwrap();
    let outcome = client.generate_key_share().await.unwrap();
    assert!(matches!(outcome, KeygenOutcome::Generated { .. }));
    assert!(client.wait_for_wallet(WAIT).await.is_ok());
}

#[tokio::test]
async fn test_mainnet_network_binding() {
    let sdk = LocalMpcSdk::new();
    let config = ClientConfig::default().with_network(NetworkConfig::ethereum_mainnet());
    let client = local_client(&sdk, config);

    client.generate_key_share().await.unwrap();
    let wallet = client.wait_for_wallet(WAIT).await.unwrap();
    sdk.fund(wallet.address(), U256::from(2u64));

    let SendOutcome::Sent { tx, .. } = client.send_ethereum_transaction().await.unwrap() else {
        panic!("expected a broadcast");
    };
    assert!(tx.explorer_url.unwrap().starts_with("https://etherscan.io/tx/"));
}

#[tokio::test]
async fn test_new_key_share_closes_previous_connection() {
    let sdk = LocalMpcSdk::new();
    let client = local_client(&sdk, ClientConfig::default());

    client.generate_key_share().await.unwrap();
    let old = client.wait_for_wallet(WAIT).await.unwrap();
    sdk.fund(old.address(), U256::from(100u64));

    client.generate_key_share().await.unwrap();
    wait_until(|| {
        client
            .state()
            .wallet()
            .is_some_and(|w| w.address() != old.address())
    })
    .await;

    assert_eq!(sdk.connection_count(), 1);

    let result = old
        .send_transaction(TransactionRequest::new(DEFAULT_RECEIVER, U256::from(10u64)))
        .await;
    assert!(matches!(result, Err(Error::ConnectionFailed(_))));
    assert_eq!(sdk.balance_of(old.address()), U256::from(100u64));
    assert!(sdk.transfers().is_empty());
}

#[tokio::test]
async fn test_slow_signing_party_keeps_client_busy() {
    let sdk = LocalMpcSdk::with_config(
        LocalSdkConfig::default().with_latency(Duration::from_millis(200)),
    );
    let client = Arc::new(local_client(&sdk, ClientConfig::default()));

    let task = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.sign_in().await })
    };
    wait_until(|| client.is_busy()).await;

    assert!(matches!(client.generate_key_share().await, Err(Error::Busy)));
    assert!(!client.state().is_signed_in());

    task.await.unwrap().unwrap();
    assert!(!client.is_busy());
    assert!(client.state().is_signed_in());
    assert_eq!(client.log().lines(), vec!["signed in as test user"]);
    assert_eq!(sdk.stats().key_shares, 0);
}
