//! # MPC Client Core
//!
//! Client-side session orchestration for 2-of-2 MPC Ethereum wallets.
//!
//! ## Architecture
//!
//! The client drives an external MPC SDK through a fixed workflow:
//! - **Sign in**: password authentication against the SDK's auth service
//! - **Key share**: 2-of-2 key generation with the remote signing party
//! - **Connection**: a signing session negotiated for every new key share,
//!   bound to an Ethereum wallet handle
//! - **Send**: half of the wallet balance transferred to a fixed receiver
//!
//! The protocol itself lives behind the traits in [`sdk`]. This crate only
//! sequences the steps, keeps the session state consistent while they run and
//! reports progress to an operator log.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mpc_client_core::{ClientConfig, LocalMpcSdk, MpcClient};
//! use std::sync::Arc;
//!
//! let client = MpcClient::new(Arc::new(LocalMpcSdk::new()), ClientConfig::default())?;
//!
//! client.sign_in().await?;
//! client.generate_key_share().await?;
//! client.wait_for_wallet(std::time::Duration::from_secs(10)).await?;
//! client.send_ethereum_transaction().await?;
//! ```
//!
//! ## Consistency Model
//!
//! - A wallet handle only exists for the key share it was derived from
//! - Replacing the key share drops the wallet in the same critical section
//! - One operation at a time, enforced by a shared busy flag
//! - A failed connection is never retried automatically

pub mod busy;
pub mod chain;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod log;
pub mod orchestrator;
pub mod sdk;
pub mod session;
pub mod types;

pub use busy::{BusyFlag, BusyGuard};
pub use chain::{ChainId, NetworkConfig, TxHash};
pub use client::{ClientSnapshot, MpcClient};
pub use config::ClientConfig;
pub use connection::ConnectionEstablisher;
pub use error::{Error, ErrorPayload, Result};
pub use log::{LogEntry, LogSink};
pub use orchestrator::{ActionOrchestrator, KeygenOutcome, SendOutcome};
pub use sdk::{EthereumWallet, MpcSdk};
pub use session::{ConnectionStatus, SessionEvent, SessionSnapshot, SessionState};
pub use types::{
    Connection, Credentials, KeyShare, KeyShareMetadata, PartiesParameters, PartyId, PartyRole,
    SessionKind, ShareId, TransactionRequest,
};

#[cfg(feature = "local")]
pub use sdk::{LocalMpcSdk, LocalSdkConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of parties holding a share
pub const N_PARTIES: usize = 2;

/// Number of parties required to sign
pub const THRESHOLD: usize = 2;
