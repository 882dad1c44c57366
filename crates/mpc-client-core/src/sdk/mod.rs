//! MPC SDK collaborator contracts
//!
//! The client never runs the MPC protocol itself. These traits describe what it
//! needs from the SDK that does: password sign-in, 2-of-2 key share
//! generation, signing-session negotiation and an Ethereum wallet adapter bound
//! to a negotiated session.
//!
//! `MpcSdk` is the union of all four and is what the orchestrator is
//! constructed with. `LocalMpcSdk` (feature `local`) implements every contract
//! in-process, playing the remote signing party.

use crate::chain::{NetworkConfig, TxHash};
use crate::{
    Connection, Credentials, KeyShare, PartiesParameters, Result, SessionKind, TransactionRequest,
};
use alloy_primitives::U256;
use std::fmt;
use std::sync::Arc;

pub use async_trait::async_trait;

#[cfg(feature = "local")]
mod legacy_tx;
#[cfg(feature = "local")]
pub mod local;

#[cfg(feature = "local")]
pub use local::{LocalMpcSdk, LocalSdkConfig};

/// Authentication service
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Sign in with e-mail and password
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<()>;
}

/// Key share generator
#[async_trait]
pub trait KeyShareGenerator: Send + Sync {
    /// Run a 2-of-2 key generation with the remote party and return the local share
    async fn generate_key_share_2of2(&self) -> Result<KeyShare>;
}

/// Session establisher
#[async_trait]
pub trait SessionEstablisher: Send + Sync {
    /// Negotiate a session of the given kind with the parties holding a share
    async fn establish_connection(
        &self,
        kind: SessionKind,
        parties: &PartiesParameters,
    ) -> Result<Connection>;

    /// Tear down a session whose key share has been replaced
    async fn close_connection(&self, _connection: &Connection) -> Result<()> {
        Ok(())
    }
}

/// Wallet handle factory
pub trait WalletFactory: Send + Sync {
    /// Bind an Ethereum wallet to a key share and a signing connection
    fn make_wallet(
        &self,
        key_share: Arc<KeyShare>,
        connection: Connection,
        network: &NetworkConfig,
    ) -> Result<Arc<dyn EthereumWallet>>;
}

/// Ethereum wallet backed by a threshold key
#[async_trait]
pub trait EthereumWallet: Send + Sync + fmt::Debug {
    /// Wallet address (0x-prefixed)
    fn address(&self) -> &str;

    /// Native balance in wei
    async fn get_balance(&self) -> Result<U256>;

    /// Sign a transfer with the remote party and broadcast it
    async fn send_transaction(&self, request: TransactionRequest) -> Result<TxHash>;
}

/// Everything the client consumes from the MPC SDK
pub trait MpcSdk: AuthService + KeyShareGenerator + SessionEstablisher + WalletFactory {}

impl<T> MpcSdk for T where T: AuthService + KeyShareGenerator + SessionEstablisher + WalletFactory {}
