//! Session state holder
//!
//! Holds the authentication flag, the current key share and the wallet handle
//! derived from it. Every mutation goes through one lock, and every key-share
//! write is announced on a broadcast channel once the write is visible.
//!
//! Each key-share write starts a new *generation*. A wallet handle can only be
//! published for the generation it was derived from, so a slow negotiation for
//! a superseded share can never bind its wallet to the newer share.

use crate::error::ErrorPayload;
use crate::sdk::EthereumWallet;
use crate::{Error, KeyShare, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// State of the signing connection for the current key share
#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No key share yet
    #[default]
    Idle,
    /// Negotiation in progress
    Connecting,
    /// Wallet handle published
    Connected,
    /// Negotiation failed; not retried automatically
    Failed { error: ErrorPayload },
}

impl ConnectionStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, ConnectionStatus::Failed { .. })
    }
}

/// Events emitted by the session holder
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Sign-in succeeded
    SignedIn,
    /// A new key share replaced the previous one
    KeyShareChanged {
        generation: u64,
        key_share: Arc<KeyShare>,
    },
    /// Negotiation started for a generation
    ConnectionStarted { generation: u64 },
    /// A wallet handle was published
    WalletReady { generation: u64, address: String },
    /// Negotiation failed for a generation
    ConnectionFailed {
        generation: u64,
        error: ErrorPayload,
    },
}

/// Point-in-time view of the session, safe to render or serialize
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub signed_in: bool,
    pub generation: u64,
    pub public_key: Option<String>,
    pub address: Option<String>,
    pub connection: ConnectionStatus,
}

#[derive(Default)]
struct Inner {
    signed_in: bool,
    key_share: Option<Arc<KeyShare>>,
    wallet: Option<Arc<dyn EthereumWallet>>,
    generation: u64,
    connection: ConnectionStatus,
}

/// Shared session state
pub struct SessionState {
    inner: RwLock<Inner>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionState {
    /// Create an empty session with the given event channel capacity
    pub fn new(event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));

        Self {
            inner: RwLock::new(Inner::default()),
            event_tx,
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn is_signed_in(&self) -> bool {
        self.inner.read().signed_in
    }

    /// Current key share
    pub fn key_share(&self) -> Option<Arc<KeyShare>> {
        self.inner.read().key_share.clone()
    }

    /// Current wallet handle
    pub fn wallet(&self) -> Option<Arc<dyn EthereumWallet>> {
        self.inner.read().wallet.clone()
    }

    /// Generation of the current key share (0 before the first one)
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.read().connection.clone()
    }

    /// Mark the session as signed in. There is no way back.
    pub fn set_signed_in(&self) {
        let mut inner = self.inner.write();
        let first = !inner.signed_in;
        inner.signed_in = true;

        if first {
            let _ = self.event_tx.send(SessionEvent::SignedIn);
        }
    }

    /// Replace the key share
    ///
    /// Clears the wallet handle in the same critical section and returns the
    /// new generation. Writing the `Arc` that is already current is ignored
    /// and returns `None`.
    pub fn set_key_share(&self, key_share: Arc<KeyShare>) -> Option<u64> {
        let mut inner = self.inner.write();

        if let Some(current) = &inner.key_share
            && Arc::ptr_eq(current, &key_share)
        {
            debug!("Ignoring write of the current key share");
            return None;
        }

        inner.generation += 1;
        inner.key_share = Some(Arc::clone(&key_share));
        inner.wallet = None;
        inner.connection = ConnectionStatus::Connecting;
        let generation = inner.generation;

        // Sent under the lock so events leave in generation order
        let _ = self.event_tx.send(SessionEvent::KeyShareChanged {
            generation,
            key_share,
        });

        Some(generation)
    }

    /// Mark negotiation as started for `generation`
    ///
    /// Returns the key share to negotiate for, or `None` if the generation has
    /// been superseded.
    pub fn begin_connection(&self, generation: u64) -> Option<Arc<KeyShare>> {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return None;
        }

        inner.connection = ConnectionStatus::Connecting;
        let _ = self
            .event_tx
            .send(SessionEvent::ConnectionStarted { generation });

        inner.key_share.clone()
    }

    /// Publish a wallet handle derived from the key share of `generation`
    pub fn publish_wallet(&self, generation: u64, wallet: Arc<dyn EthereumWallet>) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            warn!(
                published = generation,
                current = inner.generation,
                "Refusing wallet for superseded key share"
            );
            return Err(Error::StaleGeneration {
                published: generation,
                current: inner.generation,
            });
        }

        let address = wallet.address().to_string();
        inner.wallet = Some(wallet);
        inner.connection = ConnectionStatus::Connected;

        let _ = self
            .event_tx
            .send(SessionEvent::WalletReady { generation, address });

        Ok(())
    }

    /// Record a failed negotiation for `generation`
    pub fn record_connection_failure(&self, generation: u64, error: &Error) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return Err(Error::StaleGeneration {
                published: generation,
                current: inner.generation,
            });
        }

        let payload = error.payload();
        inner.connection = ConnectionStatus::Failed {
            error: payload.clone(),
        };

        let _ = self.event_tx.send(SessionEvent::ConnectionFailed {
            generation,
            error: payload,
        });

        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read();

        SessionSnapshot {
            signed_in: inner.signed_in,
            generation: inner.generation,
            public_key: inner.key_share.as_ref().map(|k| k.public_key_hex()),
            address: inner.wallet.as_ref().map(|w| w.address().to_string()),
            connection: inner.connection.clone(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CAPACITY)
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
